//! Base video inspection

use std::path::Path;

use ffmpeg_next as ffmpeg;

use crate::error::{CaptionError, FfmpegError, Result};

/// What the pipeline needs to know about the base video
#[derive(Debug, Clone, PartialEq)]
pub struct MediaProbe {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub has_audio: bool,
}

/// Source of base video metadata
pub trait MediaProber: Send + Sync {
    fn probe(&self, path: &Path) -> Result<MediaProbe>;
}

/// Probes through libavformat
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegProber;

impl MediaProber for FfmpegProber {
    fn probe(&self, path: &Path) -> Result<MediaProbe> {
        probe_video(path)
    }
}

/// Open a media file and read its container/stream metadata
pub fn probe_video<P: AsRef<Path>>(path: P) -> Result<MediaProbe> {
    let path = path.as_ref();

    // Initialize FFmpeg if not already done
    ffmpeg::init().map_err(|e| FfmpegError::InitFailed(format!("ffmpeg::init() failed: {}", e)))?;

    let context = ffmpeg::format::input(&path)
        .map_err(|e| FfmpegError::OpenInput(format!("Failed to open {:?}: {}", path, e)))?;

    let duration_secs = if context.duration() > 0 {
        context.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64
    } else {
        0.0
    };

    let video = context
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or(CaptionError::NoVideoStream)?;

    let (width, height) = unsafe {
        let params_ptr = video.parameters().as_ptr();
        ((*params_ptr).width as u32, (*params_ptr).height as u32)
    };

    let has_audio = context
        .streams()
        .best(ffmpeg::media::Type::Audio)
        .is_some();

    let probe = MediaProbe {
        duration_secs,
        width,
        height,
        has_audio,
    };
    tracing::debug!("Probed {:?}: {:?}", path, probe);

    Ok(probe)
}
