//! Timeline allocator
//!
//! Assigns every caption chunk a `[start, end)` window. Whatever the
//! strategy, the windows partition `[0, D)`: the first starts at 0, the last
//! ends at `D`, and each window ends exactly where the next begins.

use serde::{Deserialize, Serialize};

use crate::error::{CaptionError, Result};
use crate::transcript::{transcript_duration, TranscriptSegment};

use super::CaptionChunk;

/// Seconds of screen time the historic estimate gives each segment
const LEGACY_SECS_PER_SEGMENT: f64 = 2.0;

/// How caption windows are placed on the timeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingStrategy {
    /// `D` = latest segment end; every caption gets `D / N`
    #[default]
    Uniform,
    /// `D` = 2s per segment; every caption gets `D / N`.
    /// Approximate: ignores real timestamps entirely.
    SegmentCount,
    /// Captions start when their first word is estimated to be spoken,
    /// spreading words evenly across their own segment
    SegmentAligned,
}

/// The activation window of one caption
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionInterval {
    pub chunk_index: usize,
    pub start_secs: f64,
    pub end_secs: f64,
}

#[cfg(test)]
impl CaptionInterval {
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Whether `t` falls inside the half-open window
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start_secs && t < self.end_secs
    }
}

/// Total duration the given strategy spreads captions over
pub fn timeline_duration(segments: &[TranscriptSegment], strategy: TimingStrategy) -> f64 {
    match strategy {
        TimingStrategy::Uniform | TimingStrategy::SegmentAligned => transcript_duration(segments),
        TimingStrategy::SegmentCount => segments.len() as f64 * LEGACY_SECS_PER_SEGMENT,
    }
}

/// Allocate one window per chunk, index-aligned with `chunks`
pub fn allocate(
    chunks: &[CaptionChunk],
    segments: &[TranscriptSegment],
    strategy: TimingStrategy,
) -> Result<Vec<CaptionInterval>> {
    let count = chunks.len();
    let duration_secs = timeline_duration(segments, strategy);

    if count == 0 || !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(CaptionError::InvalidDuration {
            duration_secs,
            captions: count,
        });
    }

    let boundaries = match strategy {
        TimingStrategy::Uniform | TimingStrategy::SegmentCount => {
            uniform_boundaries(count, duration_secs)
        }
        TimingStrategy::SegmentAligned => aligned_boundaries(chunks, segments, duration_secs),
    };

    let intervals: Vec<CaptionInterval> = boundaries
        .windows(2)
        .enumerate()
        .map(|(chunk_index, pair)| CaptionInterval {
            chunk_index,
            start_secs: pair[0],
            end_secs: pair[1],
        })
        .collect();

    tracing::debug!(
        "Allocated {} caption windows over {:.3}s ({:?})",
        intervals.len(),
        duration_secs,
        strategy
    );

    Ok(intervals)
}

/// `count + 1` boundaries splitting `[0, duration)` into equal shares
fn uniform_boundaries(count: usize, duration_secs: f64) -> Vec<f64> {
    let mut boundaries: Vec<f64> = (0..count)
        .map(|i| i as f64 * duration_secs / count as f64)
        .collect();
    boundaries.push(duration_secs);
    boundaries
}

/// `count + 1` boundaries placed at each chunk's estimated first-word time
fn aligned_boundaries(
    chunks: &[CaptionChunk],
    segments: &[TranscriptSegment],
    duration_secs: f64,
) -> Vec<f64> {
    let mut boundaries = Vec::with_capacity(chunks.len() + 1);
    boundaries.push(0.0);

    for chunk in chunks.iter().skip(1) {
        let previous = boundaries.last().copied().unwrap_or(0.0);
        let estimate = segments
            .get(chunk.anchor_segment)
            .map(|s| s.start_secs + chunk.anchor_offset * s.duration_secs())
            .unwrap_or(previous);
        boundaries.push(estimate.max(previous).min(duration_secs));
    }

    boundaries.push(duration_secs);
    boundaries
}
