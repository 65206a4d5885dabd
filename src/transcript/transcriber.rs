//! Transcriber backends
//!
//! A `Transcriber` turns a media file into timed segments. Instances are
//! built once from configuration and handed to the pipeline, so any costly
//! setup (model loading) happens at construction, not per run.

use serde::Deserialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::config::{TranscriberBackend, TranscriberConfig};
use crate::error::{CaptionError, Result};

use super::{validate_segments, TranscriptSegment};

/// Placeholder substituted with the media path in path and argv templates
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Speech-to-text over a whole media file.
///
/// Calls block until the full transcript is available. Implementations
/// return an error instead of malformed segments.
pub trait Transcriber: Send + Sync {
    fn transcribe(&self, media: &Path) -> Result<Vec<TranscriptSegment>>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Build the transcriber selected in configuration
pub fn build_transcriber(config: &TranscriberConfig) -> Result<Arc<dyn Transcriber>> {
    match config.backend {
        TranscriberBackend::SegmentsFile => Ok(Arc::new(SegmentsFileTranscriber::new(
            config.segments_path.clone(),
        ))),
        TranscriberBackend::Command => {
            Ok(Arc::new(CommandTranscriber::new(config.command.clone())?))
        }
        #[cfg(feature = "whisper")]
        TranscriberBackend::Whisper => Ok(Arc::new(super::whisper::WhisperTranscriber::load(
            config,
        )?)),
        #[cfg(not(feature = "whisper"))]
        TranscriberBackend::Whisper => Err(CaptionError::Config(
            "whisper backend requested but caption-server was built without the `whisper` feature"
                .to_string(),
        )),
    }
}

fn expand_template(template: &str, media: &Path) -> String {
    template.replace(INPUT_PLACEHOLDER, &media.to_string_lossy())
}

/// Reads a transcript that was produced ahead of time, e.g. by running
/// `whisper video.mp4 --output_format json` next to the upload.
pub struct SegmentsFileTranscriber {
    path_template: String,
}

impl SegmentsFileTranscriber {
    pub fn new(path_template: impl Into<String>) -> Self {
        Self {
            path_template: path_template.into(),
        }
    }

    /// Resolve the transcript location for a media file
    pub fn transcript_path(&self, media: &Path) -> PathBuf {
        PathBuf::from(expand_template(&self.path_template, media))
    }
}

impl Transcriber for SegmentsFileTranscriber {
    fn transcribe(&self, media: &Path) -> Result<Vec<TranscriptSegment>> {
        let path = self.transcript_path(media);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            CaptionError::Transcription(format!(
                "Failed to read transcript {}: {}",
                path.display(),
                e
            ))
        })?;
        parse_transcript_json(&content)
    }

    fn name(&self) -> &'static str {
        "segments_file"
    }
}

/// Runs an external speech-to-text program once per call and reads its
/// JSON transcript from stdout.
pub struct CommandTranscriber {
    program: String,
    args: Vec<String>,
}

impl CommandTranscriber {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        let mut argv = argv.into_iter();
        let program = argv
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| {
                CaptionError::Config("transcriber.command must name a program".to_string())
            })?;
        Ok(Self {
            program,
            args: argv.collect(),
        })
    }

    /// Arguments for one invocation with placeholders expanded
    pub fn args_for(&self, media: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| expand_template(arg, media))
            .collect()
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, media: &Path) -> Result<Vec<TranscriptSegment>> {
        let args = self.args_for(media);
        tracing::debug!("Running transcriber {} with {} args", self.program, args.len());

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| {
                if e.kind() == ErrorKind::NotFound {
                    CaptionError::Transcription(format!(
                        "transcriber program '{}' was not found on PATH",
                        self.program
                    ))
                } else {
                    CaptionError::Transcription(format!(
                        "failed to start transcriber '{}': {}",
                        self.program, e
                    ))
                }
            })?;

        if !output.status.success() {
            return Err(CaptionError::Transcription(format!(
                "transcriber '{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_transcript_json(&String::from_utf8_lossy(&output.stdout))
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Transcript JSON layouts understood by the file and command backends
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TranscriptDocument {
    /// Our own segment list
    Segments(Vec<TranscriptSegment>),
    /// openai-whisper: times in seconds
    Whisper { segments: Vec<WhisperSegment> },
    /// whisper.cpp `-oj`: offsets in milliseconds
    WhisperCpp {
        transcription: Vec<WhisperCppSegment>,
    },
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    text: String,
    start: f64,
    end: f64,
}

#[derive(Debug, Deserialize)]
struct WhisperCppSegment {
    text: String,
    offsets: WhisperCppOffsets,
}

#[derive(Debug, Deserialize)]
struct WhisperCppOffsets {
    from: i64,
    to: i64,
}

/// Parse and validate a JSON transcript
pub fn parse_transcript_json(content: &str) -> Result<Vec<TranscriptSegment>> {
    let document: TranscriptDocument = serde_json::from_str(content).map_err(|e| {
        CaptionError::Transcription(format!("Unrecognised transcript JSON: {}", e))
    })?;

    let segments: Vec<TranscriptSegment> = match document {
        TranscriptDocument::Segments(segments) => segments,
        TranscriptDocument::Whisper { segments } => segments
            .into_iter()
            .map(|s| TranscriptSegment::new(s.text, s.start, s.end))
            .collect(),
        TranscriptDocument::WhisperCpp { transcription } => transcription
            .into_iter()
            .map(|s| {
                TranscriptSegment::new(
                    s.text,
                    s.offsets.from as f64 / 1000.0,
                    s.offsets.to as f64 / 1000.0,
                )
            })
            .collect(),
    };

    validate_segments(&segments)?;
    Ok(segments)
}
