//! Transcript model and normalization
//!
//! This module handles everything between the speech recogniser and the
//! caption chunker:
//! - Timed transcript segments as returned by a `Transcriber`
//! - Segment validation (finite, ordered, non-negative timing)
//! - Flattening segments into one ordered word sequence

pub mod transcriber;
#[cfg(feature = "whisper")]
pub mod whisper;

pub use transcriber::{
    build_transcriber, parse_transcript_json, CommandTranscriber, SegmentsFileTranscriber,
    Transcriber,
};

use serde::{Deserialize, Serialize};

use crate::error::{CaptionError, Result};

/// A span of recognised text with its start/end time in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub text: String,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl TranscriptSegment {
    pub fn new(text: impl Into<String>, start_secs: f64, end_secs: f64) -> Self {
        Self {
            text: text.into(),
            start_secs,
            end_secs,
        }
    }

    /// Length of the segment in seconds
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }
}

/// A single whitespace-delimited token and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    /// Index of the source segment
    pub segment: usize,
    /// Relative position inside the source segment, in `[0, 1)`
    pub offset: f64,
}

/// Reject segments a transcriber should never have produced.
///
/// Segments must have finite, non-negative times, `end >= start`, and be
/// ordered by non-decreasing start time.
pub fn validate_segments(segments: &[TranscriptSegment]) -> Result<()> {
    let mut previous_start = 0.0_f64;
    for (i, segment) in segments.iter().enumerate() {
        if !segment.start_secs.is_finite() || !segment.end_secs.is_finite() {
            return Err(CaptionError::Transcription(format!(
                "segment {} has non-finite timing",
                i
            )));
        }
        if segment.start_secs < 0.0 || segment.end_secs < segment.start_secs {
            return Err(CaptionError::Transcription(format!(
                "segment {} has invalid span [{}, {})",
                i, segment.start_secs, segment.end_secs
            )));
        }
        if segment.start_secs < previous_start {
            return Err(CaptionError::Transcription(format!(
                "segment {} starts at {}s, before the previous segment ({}s)",
                i, segment.start_secs, previous_start
            )));
        }
        previous_start = segment.start_secs;
    }
    Ok(())
}

/// Flatten segments into one ordered word sequence.
///
/// Each segment's text is split on whitespace and the words are concatenated
/// in segment order. Blank segments contribute nothing.
pub fn normalize(segments: &[TranscriptSegment]) -> Result<Vec<Word>> {
    let mut words = Vec::new();

    for (segment_index, segment) in segments.iter().enumerate() {
        let tokens: Vec<&str> = segment.text.split_whitespace().collect();
        let count = tokens.len();
        for (position, token) in tokens.into_iter().enumerate() {
            words.push(Word {
                text: token.to_string(),
                segment: segment_index,
                offset: position as f64 / count as f64,
            });
        }
    }

    if words.is_empty() {
        return Err(CaptionError::EmptyTranscript);
    }

    tracing::debug!(
        "Normalized {} segments into {} words",
        segments.len(),
        words.len()
    );

    Ok(words)
}

/// Total transcript duration: the latest segment end time
pub fn transcript_duration(segments: &[TranscriptSegment]) -> f64 {
    segments
        .iter()
        .map(|s| s.end_secs)
        .fold(0.0_f64, f64::max)
}
