//! Configuration file support
//!
//! Loads application configuration from TOML files. Every section and
//! field is optional; anything left out keeps its default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::caption::TimingStrategy;
use crate::config::{
    AppConfig, CaptionsConfig, CompositorConfig, JobsConfig, OverlayConfig, StyleConfig,
    TranscriberBackend, TranscriberConfig,
};
use crate::error::{CaptionError, Result};

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Server settings
    pub server: Option<ServerSettings>,
    /// Caption grouping and timing
    pub captions: Option<CaptionSettings>,
    /// Caption text style
    pub style: Option<StyleSettings>,
    /// Overlay placement
    pub overlay: Option<OverlaySettings>,
    /// External compositor
    pub compositor: Option<CompositorSettings>,
    /// Speech-to-text backend
    pub transcriber: Option<TranscriberSettings>,
    /// Upload jobs
    pub jobs: Option<JobSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to
    pub host: Option<String>,
    /// Port to listen on
    pub port: Option<u16>,
    /// Enable CORS
    pub cors_enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptionSettings {
    /// Words shown per caption
    pub words_per_caption: Option<usize>,
    /// uniform, segment_count or segment_aligned
    pub timing: Option<TimingStrategy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StyleSettings {
    pub font_path: Option<PathBuf>,
    pub font_size: Option<f32>,
    pub canvas_width: Option<u32>,
    pub canvas_height: Option<u32>,
    pub fill_color: Option<String>,
    pub stroke_color: Option<String>,
    pub stroke_width: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlaySettings {
    /// Pixels between caption and bottom edge
    pub bottom_margin: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompositorSettings {
    pub ffmpeg_path: Option<String>,
    pub video_codec: Option<String>,
    pub extra_output_args: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranscriberSettings {
    /// segments_file, command or whisper
    pub backend: Option<TranscriberBackend>,
    pub segments_path: Option<String>,
    pub command: Option<Vec<String>>,
    pub model_path: Option<String>,
    pub language: Option<String>,
    pub threads: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobSettings {
    pub work_dir: Option<PathBuf>,
    /// Maximum upload size in MB
    pub max_upload_mb: Option<usize>,
    pub max_concurrent_runs: Option<usize>,
    /// Job lifetime in seconds
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error) or a full filter
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content).map_err(|e| CaptionError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| CaptionError::Config(e.to_string()))?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let defaults = AppConfig::default();
        Self {
            server: Some(ServerSettings {
                host: Some(defaults.host),
                port: Some(defaults.port),
                cors_enabled: Some(defaults.cors_enabled),
            }),
            captions: Some(CaptionSettings {
                words_per_caption: Some(defaults.captions.words_per_caption),
                timing: Some(defaults.captions.timing),
            }),
            style: Some(StyleSettings {
                font_path: Some(defaults.style.font_path),
                font_size: Some(defaults.style.font_size),
                canvas_width: None,
                canvas_height: Some(defaults.style.canvas_height),
                fill_color: Some(defaults.style.fill_color),
                stroke_color: Some(defaults.style.stroke_color),
                stroke_width: Some(defaults.style.stroke_width),
            }),
            overlay: Some(OverlaySettings {
                bottom_margin: Some(defaults.overlay.bottom_margin),
            }),
            compositor: Some(CompositorSettings {
                ffmpeg_path: Some(defaults.compositor.ffmpeg_path),
                video_codec: None,
                extra_output_args: Some(Vec::new()),
            }),
            transcriber: Some(TranscriberSettings {
                backend: Some(defaults.transcriber.backend),
                segments_path: Some(defaults.transcriber.segments_path),
                command: None,
                model_path: None,
                language: Some(defaults.transcriber.language),
                threads: Some(defaults.transcriber.threads),
            }),
            jobs: Some(JobSettings {
                work_dir: Some(defaults.jobs.work_dir),
                max_upload_mb: Some(defaults.jobs.max_upload_mb),
                max_concurrent_runs: Some(defaults.jobs.max_concurrent_runs),
                ttl_secs: Some(defaults.jobs.ttl_secs),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to AppConfig, filling gaps with defaults
    pub fn into_app_config(self) -> AppConfig {
        let defaults = AppConfig::default();
        let server = self.server.unwrap_or_default();
        let captions = self.captions.unwrap_or_default();
        let style = self.style.unwrap_or_default();
        let overlay = self.overlay.unwrap_or_default();
        let compositor = self.compositor.unwrap_or_default();
        let transcriber = self.transcriber.unwrap_or_default();
        let jobs = self.jobs.unwrap_or_default();

        AppConfig {
            host: server.host.unwrap_or(defaults.host),
            port: server.port.unwrap_or(defaults.port),
            cors_enabled: server.cors_enabled.unwrap_or(defaults.cors_enabled),
            log_level: self
                .logging
                .as_ref()
                .map(|l| l.level.clone())
                .unwrap_or(defaults.log_level),
            log_json: self
                .logging
                .as_ref()
                .and_then(|l| l.format.as_deref())
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.log_json),
            captions: CaptionsConfig {
                words_per_caption: captions
                    .words_per_caption
                    .unwrap_or(defaults.captions.words_per_caption),
                timing: captions.timing.unwrap_or(defaults.captions.timing),
            },
            style: StyleConfig {
                font_path: style.font_path.unwrap_or(defaults.style.font_path),
                font_size: style.font_size.unwrap_or(defaults.style.font_size),
                canvas_width: style.canvas_width.or(defaults.style.canvas_width),
                canvas_height: style.canvas_height.unwrap_or(defaults.style.canvas_height),
                fill_color: style.fill_color.unwrap_or(defaults.style.fill_color),
                stroke_color: style.stroke_color.unwrap_or(defaults.style.stroke_color),
                stroke_width: style.stroke_width.unwrap_or(defaults.style.stroke_width),
            },
            overlay: OverlayConfig {
                bottom_margin: overlay
                    .bottom_margin
                    .unwrap_or(defaults.overlay.bottom_margin),
            },
            compositor: CompositorConfig {
                ffmpeg_path: compositor
                    .ffmpeg_path
                    .unwrap_or(defaults.compositor.ffmpeg_path),
                video_codec: compositor.video_codec.or(defaults.compositor.video_codec),
                extra_output_args: compositor
                    .extra_output_args
                    .unwrap_or(defaults.compositor.extra_output_args),
            },
            transcriber: TranscriberConfig {
                backend: transcriber.backend.unwrap_or(defaults.transcriber.backend),
                segments_path: transcriber
                    .segments_path
                    .unwrap_or(defaults.transcriber.segments_path),
                command: transcriber.command.unwrap_or(defaults.transcriber.command),
                model_path: transcriber.model_path.or(defaults.transcriber.model_path),
                language: transcriber.language.unwrap_or(defaults.transcriber.language),
                threads: transcriber.threads.unwrap_or(defaults.transcriber.threads),
            },
            jobs: JobsConfig {
                work_dir: jobs.work_dir.unwrap_or(defaults.jobs.work_dir),
                max_upload_mb: jobs.max_upload_mb.unwrap_or(defaults.jobs.max_upload_mb),
                max_concurrent_runs: jobs
                    .max_concurrent_runs
                    .unwrap_or(defaults.jobs.max_concurrent_runs),
                ttl_secs: jobs.ttl_secs.unwrap_or(defaults.jobs.ttl_secs),
            },
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<()> {
    ConfigFile::default_config().to_file(path)
}
