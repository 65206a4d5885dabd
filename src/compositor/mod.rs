//! Compositor
//!
//! Executes a [`CompositionPlan`] with the ffmpeg command line tool.

use std::path::Path;
use std::process::Command;

use crate::config::CompositorConfig;
use crate::error::{CaptionError, Result};
use crate::overlay::CompositionPlan;

/// Bytes of ffmpeg's stderr repeated in the log on failure
const LOG_EXCERPT_BYTES: usize = 2 * 1024;

/// Runs a composition plan to completion, writing `output`.
///
/// Single-shot and blocking: either the whole file is produced or an error
/// is returned.
pub trait Compositor: Send + Sync {
    fn compose(&self, plan: &CompositionPlan, output: &Path) -> Result<()>;
}

pub struct FfmpegCompositor {
    program: String,
    video_codec: Option<String>,
    extra_output_args: Vec<String>,
}

impl FfmpegCompositor {
    pub fn new(config: &CompositorConfig) -> Self {
        Self {
            program: config.ffmpeg_path.clone(),
            video_codec: config.video_codec.clone(),
            extra_output_args: config.extra_output_args.clone(),
        }
    }

    /// Full ffmpeg argument list for `plan`
    pub fn args(&self, plan: &CompositionPlan, output: &Path) -> Result<Vec<String>> {
        let last = plan
            .output_label()
            .ok_or_else(|| CaptionError::GraphBuild("plan has no overlay nodes".to_string()))?;

        let mut args: Vec<String> = vec!["-hide_banner".into(), "-nostdin".into(), "-y".into()];

        args.push("-i".into());
        args.push(plan.base_video.to_string_lossy().into_owned());
        for image in &plan.images {
            args.push("-i".into());
            args.push(image.path.to_string_lossy().into_owned());
        }

        args.push("-filter_complex".into());
        args.push(plan.filter_graph());
        args.push("-map".into());
        args.push(format!("[{}]", last));
        // Audio passes through untouched when present
        args.push("-map".into());
        args.push("0:a?".into());
        args.push("-c:a".into());
        args.push("copy".into());

        if let Some(codec) = &self.video_codec {
            args.push("-c:v".into());
            args.push(codec.clone());
        }
        args.extend(self.extra_output_args.iter().cloned());
        args.push(output.to_string_lossy().into_owned());

        Ok(args)
    }
}

impl Compositor for FfmpegCompositor {
    fn compose(&self, plan: &CompositionPlan, output: &Path) -> Result<()> {
        let args = self.args(plan, output)?;

        tracing::info!(
            "Compositing {} captions onto {}",
            plan.nodes.len(),
            plan.base_video.display()
        );
        tracing::debug!("{} {}", self.program, args.join(" "));

        let result = Command::new(&self.program).args(&args).output();
        let out = match result {
            Ok(out) => out,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(CaptionError::CompositionExecution {
                    status: None,
                    diagnostics: format!("{} not found on PATH", self.program),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !out.status.success() {
            let diagnostics = String::from_utf8_lossy(&out.stderr).trim().to_string();
            tracing::warn!(
                "{} exited with {:?}: {}",
                self.program,
                out.status.code(),
                tail(&diagnostics, LOG_EXCERPT_BYTES)
            );
            return Err(CaptionError::CompositionExecution {
                status: out.status.code(),
                diagnostics,
            });
        }

        Ok(())
    }
}

/// Last `max` bytes of `text`, on a char boundary
fn tail(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut start = text.len() - max;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
