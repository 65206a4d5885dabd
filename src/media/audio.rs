//! Speech audio extraction
//!
//! Decodes the best audio stream of a media file and resamples it to the
//! 16 kHz mono `f32` PCM that whisper models expect.

use std::path::Path;

use ffmpeg_next as ffmpeg;
use ffmpeg_next::software::resampling;
use ffmpeg_next::util::channel_layout::ChannelLayout;
use ffmpeg_next::util::format::sample::Sample;

use crate::error::{CaptionError, FfmpegError, Result};

/// Sample rate whisper models are trained on
pub const SPEECH_SAMPLE_RATE: u32 = 16_000;
/// Packed float mono, read straight out of plane 0
pub const SPEECH_SAMPLE_FORMAT: Sample = Sample::F32(ffmpeg::util::format::sample::Type::Packed);

/// Decode the whole audio track into 16 kHz mono samples
pub fn decode_speech_samples<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let mut input = ffmpeg::format::input(&path)
        .map_err(|e| FfmpegError::OpenInput(format!("Failed to open {:?}: {}", path, e)))?;

    let stream = input
        .streams()
        .best(ffmpeg::media::Type::Audio)
        .ok_or_else(|| CaptionError::Transcription(format!("{:?} has no audio stream", path)))?;
    let stream_index = stream.index();

    let context = ffmpeg::codec::Context::from_parameters(stream.parameters()).map_err(|e| {
        FfmpegError::DecoderNotFound(format!(
            "Failed to create codec context for stream {}: {}",
            stream_index, e
        ))
    })?;
    let mut decoder = context.decoder().audio().map_err(|e| {
        FfmpegError::DecoderNotFound(format!(
            "Failed to open audio decoder for stream {}: {}",
            stream_index, e
        ))
    })?;

    let mut resampler: Option<resampling::Context> = None;
    let mut samples = Vec::new();
    let mut frame = ffmpeg::util::frame::Audio::empty();

    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        match decoder.send_packet(&packet) {
            Ok(()) => {}
            // Pre-roll packets after a seek; keep going
            Err(ffmpeg::Error::InvalidData) => continue,
            Err(e) => {
                return Err(FfmpegError::DecodePacket(format!(
                    "send_packet error on stream {}: {}",
                    stream_index, e
                ))
                .into())
            }
        }
        while decoder.receive_frame(&mut frame).is_ok() {
            resample_into(&mut resampler, &frame, &mut samples)?;
        }
    }

    // Drain the decoder; EOF/EAGAIN here just mean nothing is buffered
    if decoder.send_eof().is_ok() {
        while decoder.receive_frame(&mut frame).is_ok() {
            resample_into(&mut resampler, &frame, &mut samples)?;
        }
    }

    if let Some(context) = resampler.as_mut() {
        let mut out = ffmpeg::util::frame::Audio::empty();
        if context.flush(&mut out).is_ok() && out.samples() > 0 {
            append_plane(&out, &mut samples);
        }
    }

    tracing::debug!(
        "Decoded {} speech samples ({:.1}s) from {:?}",
        samples.len(),
        samples.len() as f64 / SPEECH_SAMPLE_RATE as f64,
        path
    );

    Ok(samples)
}

fn resample_into(
    resampler: &mut Option<resampling::Context>,
    frame: &ffmpeg::util::frame::Audio,
    samples: &mut Vec<f32>,
) -> Result<()> {
    if resampler.is_none() {
        let src_layout = if frame.channel_layout().bits() == 0 {
            // No channel layout set; fall back based on channel count
            match frame.channels() {
                1 => ChannelLayout::MONO,
                _ => ChannelLayout::STEREO,
            }
        } else {
            frame.channel_layout()
        };
        let context = resampling::Context::get(
            frame.format(),
            src_layout,
            frame.rate(),
            SPEECH_SAMPLE_FORMAT,
            ChannelLayout::MONO,
            SPEECH_SAMPLE_RATE,
        )
        .map_err(|e| {
            FfmpegError::ResamplerCreate(format!("Failed to create resampling context: {}", e))
        })?;
        *resampler = Some(context);
    }

    if let Some(context) = resampler.as_mut() {
        // Output frame must be empty so swr allocates it from its own config
        let mut out = ffmpeg::util::frame::Audio::empty();
        context
            .run(frame, &mut out)
            .map_err(|e| FfmpegError::ReadFrame(format!("Resampling error: {}", e)))?;
        if out.samples() > 0 {
            append_plane(&out, samples);
        }
    }
    Ok(())
}

fn append_plane(frame: &ffmpeg::util::frame::Audio, samples: &mut Vec<f32>) {
    let plane: &[f32] = frame.plane(0);
    samples.extend_from_slice(&plane[..frame.samples().min(plane.len())]);
}
