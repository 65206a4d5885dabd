//! Application configuration

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::caption::TimingStrategy;
use crate::error::{CaptionError, Result};

/// Caption grouping and timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionsConfig {
    /// Words shown per caption
    pub words_per_caption: usize,

    /// How caption windows are placed on the timeline
    pub timing: TimingStrategy,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            words_per_caption: 2,
            timing: TimingStrategy::Uniform,
        }
    }
}

impl CaptionsConfig {
    /// Validated chunk size
    pub fn chunk_size(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.words_per_caption).ok_or_else(|| {
            CaptionError::Config("words_per_caption must be at least 1".to_string())
        })
    }
}

/// Caption text style
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    /// TrueType/OpenType font file
    pub font_path: PathBuf,

    /// Font size in pixels
    pub font_size: f32,

    /// Canvas width; follows the video width when unset
    pub canvas_width: Option<u32>,

    /// Canvas height in pixels
    pub canvas_height: u32,

    /// Text colour, `#RRGGBB[AA]`
    pub fill_color: String,

    /// Outline colour, `#RRGGBB[AA]`
    pub stroke_color: String,

    /// Outline width in pixels
    pub stroke_width: u32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("montserrat.ttf"),
            font_size: 48.0,
            canvas_width: None,
            canvas_height: 200,
            fill_color: "#FFFFFFFF".to_string(),
            stroke_color: "#000000FF".to_string(),
            stroke_width: 2,
        }
    }
}

/// Overlay placement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Pixels between the caption canvas and the bottom of the frame
    pub bottom_margin: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { bottom_margin: 50 }
    }
}

/// External compositor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositorConfig {
    /// ffmpeg binary, looked up on PATH unless absolute
    pub ffmpeg_path: String,

    /// Video encoder (ffmpeg's default when unset)
    pub video_codec: Option<String>,

    /// Extra arguments placed before the output path
    pub extra_output_args: Vec<String>,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            video_codec: None,
            extra_output_args: Vec::new(),
        }
    }
}

/// Transcriber backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriberBackend {
    /// Read a JSON transcript stored next to the media
    #[default]
    SegmentsFile,
    /// Run an external program that prints a JSON transcript
    Command,
    /// In-process whisper.cpp (requires the `whisper` feature)
    Whisper,
}

/// Transcriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    pub backend: TranscriberBackend,

    /// Transcript path template; `{input}` is the media path
    pub segments_path: String,

    /// argv template for the `command` backend
    pub command: Vec<String>,

    /// ggml model file for the `whisper` backend
    pub model_path: Option<String>,

    /// Spoken language, or `auto`
    pub language: String,

    /// Inference threads
    pub threads: usize,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            backend: TranscriberBackend::SegmentsFile,
            segments_path: "{input}.segments.json".to_string(),
            command: Vec::new(),
            model_path: None,
            language: "auto".to_string(),
            threads: 4,
        }
    }
}

/// Upload job limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Root for job and run directories
    pub work_dir: PathBuf,

    /// Largest accepted upload in megabytes
    pub max_upload_mb: usize,

    /// Pipeline runs allowed at the same time
    pub max_concurrent_runs: usize,

    /// Seconds before an idle job is evicted
    pub ttl_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            work_dir: std::env::temp_dir().join("caption-server"),
            max_upload_mb: 512,
            max_concurrent_runs: 2,
            ttl_secs: 3600,
        }
    }
}

impl JobsConfig {
    /// Get maximum upload size in bytes
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb * 1024 * 1024
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Log filter used when RUST_LOG is unset
    pub log_level: String,

    /// Emit JSON log lines
    pub log_json: bool,

    pub captions: CaptionsConfig,
    pub style: StyleConfig,
    pub overlay: OverlayConfig,
    pub compositor: CompositorConfig,
    pub transcriber: TranscriberConfig,
    pub jobs: JobsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            cors_enabled: true,
            log_level: "caption_server=debug,tower_http=debug".to_string(),
            log_json: false,
            captions: CaptionsConfig::default(),
            style: StyleConfig::default(),
            overlay: OverlayConfig::default(),
            compositor: CompositorConfig::default(),
            transcriber: TranscriberConfig::default(),
            jobs: JobsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the socket address string
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
