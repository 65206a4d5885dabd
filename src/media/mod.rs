//! FFmpeg module - library access for inspecting the uploaded media
//!
//! This module handles:
//! - FFmpeg initialization
//! - Probing the base video (dimensions, duration, audio presence)
//! - Decoding and resampling speech audio for local transcription

#[cfg(feature = "whisper")]
pub mod audio;
pub mod probe;

pub use ffmpeg_next as ffmpeg;
pub use probe::{probe_video, FfmpegProber, MediaProbe, MediaProber};

/// Initialize FFmpeg library
///
/// This should be called once at application startup.
/// Returns an error if FFmpeg fails to initialize.
pub fn init() -> Result<(), crate::error::FfmpegError> {
    ffmpeg::init().map_err(|e| {
        crate::error::FfmpegError::InitFailed(format!("ffmpeg::init() failed: {}", e))
    })?;

    // Keep demuxer chatter out of our logs
    ffmpeg::util::log::set_level(ffmpeg::util::log::Level::Warning);

    tracing::info!("FFmpeg initialized");

    Ok(())
}
