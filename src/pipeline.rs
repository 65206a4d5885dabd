//! Caption pipeline driver
//!
//! One run is a single sequential pass:
//! probe → transcribe → normalise/chunk → allocate → render → composite.
//! Every stage fails fast and nothing is delivered unless the compositor
//! succeeds.

use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::caption::{allocate, chunk_words, TimingStrategy};
use crate::compositor::{Compositor, FfmpegCompositor};
use crate::config::{AppConfig, StyleConfig};
use crate::error::{CaptionError, Result};
use crate::media::{FfmpegProber, MediaProber};
use crate::overlay::{CompositionPlan, OverlayPlacement};
use crate::render::{CaptionImageBuilder, CaptionStyle, FontdueRenderer, GlyphRenderer};
use crate::transcript::{build_transcriber, normalize, validate_segments, Transcriber};
use crate::workspace::{persist_output, RunWorkspace};

/// Pipeline stage, reported as a run progresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    /// Waiting for a free run slot
    Queued,
    Probing,
    Transcribing,
    Chunking,
    Allocating,
    Rendering,
    Compositing,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Queued => "queued",
            RunStage::Probing => "probing",
            RunStage::Transcribing => "transcribing",
            RunStage::Chunking => "chunking",
            RunStage::Allocating => "allocating",
            RunStage::Rendering => "rendering",
            RunStage::Compositing => "compositing",
        };
        f.write_str(name)
    }
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub segment_count: usize,
    pub word_count: usize,
    pub chunk_count: usize,
    /// Timeline length the captions cover
    pub duration_secs: f64,
    pub output: PathBuf,
    pub elapsed_secs: f64,
}

pub struct CaptionPipeline {
    prober: Arc<dyn MediaProber>,
    transcriber: Arc<dyn Transcriber>,
    renderer: Arc<dyn GlyphRenderer>,
    compositor: Arc<dyn Compositor>,
    chunk_size: NonZeroUsize,
    timing: TimingStrategy,
    style: StyleConfig,
    placement: OverlayPlacement,
    work_dir: PathBuf,
}

impl CaptionPipeline {
    /// Assemble a pipeline from explicit collaborators
    pub fn new(
        config: &AppConfig,
        transcriber: Arc<dyn Transcriber>,
        renderer: Arc<dyn GlyphRenderer>,
        compositor: Arc<dyn Compositor>,
    ) -> Result<Self> {
        Ok(Self {
            prober: Arc::new(FfmpegProber),
            transcriber,
            renderer,
            compositor,
            chunk_size: config.captions.chunk_size()?,
            timing: config.captions.timing,
            style: config.style.clone(),
            placement: OverlayPlacement {
                bottom_margin: config.overlay.bottom_margin,
            },
            work_dir: config.jobs.work_dir.clone(),
        })
    }

    /// Assemble the production pipeline.
    ///
    /// Building the transcriber may load a speech model, which can take
    /// seconds; do it once and share the pipeline.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let transcriber = build_transcriber(&config.transcriber)?;
        tracing::info!("Using {} transcriber", transcriber.name());

        Self::new(
            config,
            transcriber,
            Arc::new(FontdueRenderer::new()),
            Arc::new(FfmpegCompositor::new(&config.compositor)),
        )
    }

    /// Replace the media prober
    pub fn with_prober(mut self, prober: Arc<dyn MediaProber>) -> Self {
        self.prober = prober;
        self
    }

    /// Caption `input` into `output`, reporting each stage to `observer`.
    ///
    /// `output` is only written once the compositor has succeeded.
    pub fn run<F>(&self, input: &Path, output: &Path, mut observer: F) -> Result<RunReport>
    where
        F: FnMut(RunStage),
    {
        let started = Instant::now();

        observer(RunStage::Probing);
        let probe = self.prober.probe(input)?;
        let style = CaptionStyle::from_config(&self.style, Some(probe.width).filter(|w| *w > 0))?;
        tracing::info!(
            "Probed {}: {}x{}, {:.2}s, audio={}",
            input.display(),
            probe.width,
            probe.height,
            probe.duration_secs,
            probe.has_audio
        );

        observer(RunStage::Transcribing);
        let segments = self.transcriber.transcribe(input)?;
        validate_segments(&segments)?;
        tracing::info!(
            "Transcribed {} segments with {}",
            segments.len(),
            self.transcriber.name()
        );

        observer(RunStage::Chunking);
        let words = normalize(&segments)?;
        let chunks = chunk_words(&words, self.chunk_size);
        tracing::info!("{} words in {} captions", words.len(), chunks.len());

        observer(RunStage::Allocating);
        let intervals = allocate(&chunks, &segments, self.timing)?;
        let duration_secs = intervals.last().map(|i| i.end_secs).unwrap_or(0.0);
        if probe.duration_secs > 0.0 && duration_secs > probe.duration_secs + 0.5 {
            tracing::warn!(
                "Caption timeline ({:.2}s) runs past the end of the video ({:.2}s)",
                duration_secs,
                probe.duration_secs
            );
        }
        for interval in &intervals {
            tracing::debug!(
                "Caption {}: [{:.3}, {:.3})",
                interval.chunk_index,
                interval.start_secs,
                interval.end_secs
            );
        }

        observer(RunStage::Rendering);
        let workspace = RunWorkspace::create(&self.work_dir)?;
        let images = CaptionImageBuilder::new(self.renderer.clone(), style)
            .build(&chunks, workspace.path())?;
        tracing::info!("Rendered {} caption images", images.len());

        observer(RunStage::Compositing);
        let plan = CompositionPlan::build(input, images, &intervals, self.placement)?;
        let scratch = workspace.scratch_output(output);
        self.compositor.compose(&plan, &scratch)?;
        if !scratch.is_file() {
            return Err(CaptionError::CompositionExecution {
                status: Some(0),
                diagnostics: "compositor reported success but wrote no output".to_string(),
            });
        }
        persist_output(&scratch, output)?;

        let report = RunReport {
            segment_count: segments.len(),
            word_count: words.len(),
            chunk_count: chunks.len(),
            duration_secs,
            output: output.to_path_buf(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        tracing::info!(
            "Captioned {} -> {} ({} captions, chain of {}) in {:.2}s",
            input.display(),
            output.display(),
            report.chunk_count,
            plan.nodes.len(),
            report.elapsed_secs
        );

        Ok(report)
    }
}
