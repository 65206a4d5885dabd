//! Local whisper.cpp transcription
//!
//! Construction loads the GGML model into memory, which takes seconds and
//! hundreds of megabytes; build one `WhisperTranscriber` per process and
//! share it between runs. Each call creates its own decoding state, so
//! concurrent runs do not interfere.

use std::path::Path;

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::config::TranscriberConfig;
use crate::error::{CaptionError, Result};
use crate::media::audio::decode_speech_samples;

use super::{validate_segments, Transcriber, TranscriptSegment};

pub struct WhisperTranscriber {
    context: WhisperContext,
    language: String,
    threads: usize,
}

impl WhisperTranscriber {
    /// Load the model named in `transcriber.model_path`
    pub fn load(config: &TranscriberConfig) -> Result<Self> {
        let model_path = config.model_path.as_deref().ok_or_else(|| {
            CaptionError::Config("transcriber.model_path is required for whisper".to_string())
        })?;

        let started = std::time::Instant::now();
        let context =
            WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
                .map_err(|e| {
                    CaptionError::Transcription(format!(
                        "failed to load whisper model {}: {}",
                        model_path, e
                    ))
                })?;
        tracing::info!(
            "Loaded whisper model {} in {:.1}s",
            model_path,
            started.elapsed().as_secs_f64()
        );

        Ok(Self {
            context,
            language: config.language.clone(),
            threads: config.threads,
        })
    }
}

impl Transcriber for WhisperTranscriber {
    fn transcribe(&self, media: &Path) -> Result<Vec<TranscriptSegment>> {
        let samples = decode_speech_samples(media)?;

        let mut state = self.context.create_state().map_err(|e| {
            CaptionError::Transcription(format!("failed to create whisper state: {}", e))
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_n_threads(self.threads as i32);
        params.set_language(Some(self.language.as_str()));
        params.set_no_timestamps(false);
        params.set_print_realtime(false);
        params.set_print_progress(false);
        params.set_print_timestamps(false);

        state
            .full(params, &samples)
            .map_err(|e| CaptionError::Transcription(format!("full decode failed: {}", e)))?;

        let mut segments = Vec::new();
        for idx in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(idx) else {
                continue;
            };
            // whisper timestamps are in centiseconds
            let start_secs = segment.start_timestamp() as f64 / 100.0;
            let end_secs = segment.end_timestamp() as f64 / 100.0;
            let text = segment
                .to_str_lossy()
                .map(|cow| cow.to_string())
                .unwrap_or_default();
            segments.push(TranscriptSegment::new(text, start_secs, end_secs.max(start_secs)));
        }

        validate_segments(&segments)?;
        Ok(segments)
    }

    fn name(&self) -> &'static str {
        "whisper"
    }
}
