//! Test fixtures for integration tests
//!
//! Deterministic stand-ins for the external collaborators, so whole
//! pipeline runs can be exercised without media files, fonts or ffmpeg.

use image::RgbaImage;
use parking_lot::{Condvar, Mutex};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::compositor::Compositor;
use crate::config::AppConfig;
use crate::error::{CaptionError, Result};
use crate::media::{MediaProbe, MediaProber};
use crate::overlay::CompositionPlan;
use crate::pipeline::CaptionPipeline;
use crate::render::{CaptionStyle, GlyphRenderer};
use crate::transcript::{Transcriber, TranscriptSegment};

/// "see you later friend" over 4 seconds
pub fn see_you_later() -> Vec<TranscriptSegment> {
    vec![
        TranscriptSegment::new("see you", 0.0, 1.5),
        TranscriptSegment::new("later friend", 1.5, 4.0),
    ]
}

/// Five words, so the last caption holds one
pub fn five_words() -> Vec<TranscriptSegment> {
    vec![
        TranscriptSegment::new("one two three", 0.0, 3.0),
        TranscriptSegment::new("four five", 3.0, 5.0),
    ]
}

/// Reports fixed metadata for any path
pub struct FakeProber {
    pub probe: MediaProbe,
}

impl FakeProber {
    pub fn hd() -> Self {
        Self {
            probe: MediaProbe {
                duration_secs: 4.0,
                width: 1280,
                height: 720,
                has_audio: true,
            },
        }
    }
}

impl MediaProber for FakeProber {
    fn probe(&self, _path: &Path) -> Result<MediaProbe> {
        Ok(self.probe.clone())
    }
}

/// Holds a run inside a collaborator until the test opens it
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.open.lock() = true;
        self.opened.notify_all();
    }

    fn wait(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }
}

/// Returns canned segments, or fails when built with `failing`
pub struct FakeTranscriber {
    segments: Vec<TranscriptSegment>,
    fail_with: Option<String>,
    gate: Option<Arc<Gate>>,
}

impl FakeTranscriber {
    pub fn new(segments: Vec<TranscriptSegment>) -> Self {
        Self {
            segments,
            fail_with: None,
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            segments: Vec::new(),
            fail_with: Some(message.to_string()),
            gate: None,
        }
    }

    /// Blocks every transcription until `gate` is opened
    pub fn gated(segments: Vec<TranscriptSegment>, gate: Arc<Gate>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(segments)
        }
    }
}

impl Transcriber for FakeTranscriber {
    fn transcribe(&self, _media: &Path) -> Result<Vec<TranscriptSegment>> {
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        match &self.fail_with {
            Some(message) => Err(CaptionError::Transcription(message.clone())),
            None => Ok(self.segments.clone()),
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// Draws one opaque row per character, no font needed
pub struct BlockRenderer;

impl GlyphRenderer for BlockRenderer {
    fn render(&self, text: &str, style: &CaptionStyle) -> Result<RgbaImage> {
        let mut image = RgbaImage::new(style.canvas_width, style.canvas_height);
        let rows = (text.chars().count() as u32).min(style.canvas_height);
        for y in 0..rows {
            for x in 0..style.canvas_width {
                image.put_pixel(x, y, image::Rgba(style.fill_color));
            }
        }
        Ok(image)
    }
}

/// What the fake compositor saw
#[derive(Debug, Clone)]
pub struct ComposeCall {
    pub filter_graph: String,
    pub node_count: usize,
    pub image_paths: Vec<PathBuf>,
    /// Whether every caption image existed when compose was called
    pub images_present: bool,
    pub output: PathBuf,
}

/// Records plans and writes the filter graph as the "video"
#[derive(Default)]
pub struct FakeCompositor {
    pub calls: Mutex<Vec<ComposeCall>>,
    pub fail_status: Option<i32>,
}

impl FakeCompositor {
    pub fn failing(status: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_status: Some(status),
        }
    }

    pub fn calls(&self) -> Vec<ComposeCall> {
        self.calls.lock().clone()
    }
}

impl Compositor for FakeCompositor {
    fn compose(&self, plan: &CompositionPlan, output: &Path) -> Result<()> {
        let filter_graph = plan.filter_graph();
        self.calls.lock().push(ComposeCall {
            filter_graph: filter_graph.clone(),
            node_count: plan.nodes.len(),
            image_paths: plan.images.iter().map(|i| i.path.clone()).collect(),
            images_present: plan.images.iter().all(|i| i.path.is_file()),
            output: output.to_path_buf(),
        });

        if let Some(status) = self.fail_status {
            // A real encoder may leave a truncated file behind
            std::fs::write(output, b"partial")?;
            return Err(CaptionError::CompositionExecution {
                status: Some(status),
                diagnostics: "Error while filtering: Invalid argument".to_string(),
            });
        }

        std::fs::write(output, filter_graph.as_bytes())?;
        Ok(())
    }
}

/// Pipeline over the given fakes
pub fn pipeline_with(
    config: &AppConfig,
    transcriber: FakeTranscriber,
    compositor: Arc<FakeCompositor>,
) -> CaptionPipeline {
    CaptionPipeline::new(
        config,
        Arc::new(transcriber),
        Arc::new(BlockRenderer),
        compositor,
    )
    .unwrap()
    .with_prober(Arc::new(FakeProber::hd()))
}

/// Pipeline that always succeeds on the "see you later friend" transcript
pub fn fake_pipeline(config: &AppConfig) -> CaptionPipeline {
    pipeline_with(
        config,
        FakeTranscriber::new(see_you_later()),
        Arc::new(FakeCompositor::default()),
    )
}

/// Config whose scratch space lives under `work_dir`
pub fn test_config(work_dir: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.jobs.work_dir = work_dir.to_path_buf();
    config.style.canvas_height = 40;
    config
}

/// Names of entries left in `dir`
pub fn leftovers(dir: &Path) -> Vec<String> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default()
}
