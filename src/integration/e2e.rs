//! End-to-end pipeline tests
//!
//! Full runs through probe → transcribe → chunk → allocate → render →
//! composite, with fakes for the external collaborators. One test drives
//! the real ffmpeg and fontdue path when both are available on the host.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use crate::caption::TimingStrategy;
use crate::error::CaptionError;
use crate::pipeline::{CaptionPipeline, RunStage};
use crate::transcript::TranscriptSegment;

use super::fixtures::{
    five_words, leftovers, pipeline_with, see_you_later, test_config, FakeCompositor,
    FakeTranscriber,
};

#[test]
fn test_full_run_produces_output() {
    let work = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let compositor = Arc::new(FakeCompositor::default());
    let pipeline = pipeline_with(
        &config,
        FakeTranscriber::new(see_you_later()),
        compositor.clone(),
    );

    let output = out_dir.path().join("captioned_video.mp4");
    let mut stages = Vec::new();
    let report = pipeline
        .run(&PathBuf::from("/uploads/in.mp4"), &output, |s| stages.push(s))
        .unwrap();

    assert_eq!(
        stages,
        vec![
            RunStage::Probing,
            RunStage::Transcribing,
            RunStage::Chunking,
            RunStage::Allocating,
            RunStage::Rendering,
            RunStage::Compositing,
        ]
    );
    assert_eq!(report.word_count, 4);
    assert_eq!(report.chunk_count, 2);
    assert_eq!(report.duration_secs, 4.0);
    assert_eq!(report.output, output);

    let calls = compositor.calls();
    assert_eq!(calls.len(), 1, "compositor runs exactly once");
    assert_eq!(calls[0].node_count, 2);
    assert!(calls[0].images_present);
    assert!(calls[0]
        .filter_graph
        .contains("enable='gte(t,2.000000)*lt(t,4.000000)'[cap1]"));

    // Delivered, and the scratch space is gone
    let delivered = std::fs::read_to_string(&output).unwrap();
    assert_eq!(delivered, calls[0].filter_graph);
    assert!(!calls[0].output.exists());
    assert!(calls[0].image_paths.iter().all(|p| !p.exists()));
    assert!(leftovers(work.path()).is_empty());
}

#[test]
fn test_odd_word_count_keeps_last_caption() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let compositor = Arc::new(FakeCompositor::default());
    let pipeline = pipeline_with(&config, FakeTranscriber::new(five_words()), compositor.clone());

    let output = work.path().join("out.mp4");
    let report = pipeline
        .run(&PathBuf::from("in.mp4"), &output, |_| {})
        .unwrap();

    assert_eq!(report.chunk_count, 3);
    let graph = &compositor.calls()[0].filter_graph;
    assert!(graph.ends_with("[cap1][3:v]overlay=x=(W-w)/2:y=H-h-50:enable='gte(t,3.333333)*lt(t,5.000000)'[cap2]"));
}

#[test]
fn test_segment_aligned_timing_follows_segments() {
    let work = tempfile::tempdir().unwrap();
    let mut config = test_config(work.path());
    config.captions.timing = TimingStrategy::SegmentAligned;
    let compositor = Arc::new(FakeCompositor::default());
    let segments = vec![
        TranscriptSegment::new("hello there", 1.0, 2.0),
        TranscriptSegment::new("general kenobi", 5.0, 6.5),
    ];
    let pipeline = pipeline_with(&config, FakeTranscriber::new(segments), compositor.clone());

    pipeline
        .run(&PathBuf::from("in.mp4"), &work.path().join("o.mp4"), |_| {})
        .unwrap();

    let graph = &compositor.calls()[0].filter_graph;
    assert!(graph.contains("gte(t,0.000000)*lt(t,5.000000)"));
    assert!(graph.contains("gte(t,5.000000)*lt(t,6.500000)"));
}

#[test]
fn test_three_words_per_caption() {
    let work = tempfile::tempdir().unwrap();
    let mut config = test_config(work.path());
    config.captions.words_per_caption = 3;
    let compositor = Arc::new(FakeCompositor::default());
    let pipeline = pipeline_with(&config, FakeTranscriber::new(five_words()), compositor.clone());

    let report = pipeline
        .run(&PathBuf::from("in.mp4"), &work.path().join("o.mp4"), |_| {})
        .unwrap();
    assert_eq!(report.chunk_count, 2);
    assert_eq!(compositor.calls()[0].node_count, 2);
}

#[test]
fn test_empty_transcript_aborts_before_rendering() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let compositor = Arc::new(FakeCompositor::default());
    let segments = vec![TranscriptSegment::new("   ", 0.0, 2.0)];
    let pipeline = pipeline_with(&config, FakeTranscriber::new(segments), compositor.clone());

    let output = work.path().join("out.mp4");
    let mut stages = Vec::new();
    let result = pipeline.run(&PathBuf::from("in.mp4"), &output, |s| stages.push(s));

    assert!(matches!(result, Err(CaptionError::EmptyTranscript)));
    assert_eq!(stages.last(), Some(&RunStage::Chunking));
    assert!(compositor.calls().is_empty());
    assert!(!output.exists());
}

#[test]
fn test_transcriber_failure_is_reported() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let pipeline = pipeline_with(
        &config,
        FakeTranscriber::failing("model exploded"),
        Arc::new(FakeCompositor::default()),
    );

    match pipeline.run(&PathBuf::from("in.mp4"), &work.path().join("o.mp4"), |_| {}) {
        Err(e) => {
            assert_eq!(e.kind(), "transcription");
            assert!(e.to_string().contains("model exploded"));
        }
        Ok(_) => panic!("run should fail"),
    }
}

#[test]
fn test_compositor_failure_leaves_no_output() {
    let work = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let compositor = Arc::new(FakeCompositor::failing(1));
    let pipeline = pipeline_with(&config, FakeTranscriber::new(see_you_later()), compositor);

    let output = out_dir.path().join("captioned_video.mp4");
    let result = pipeline.run(&PathBuf::from("in.mp4"), &output, |_| {});

    match result {
        Err(CaptionError::CompositionExecution {
            status,
            diagnostics,
        }) => {
            assert_eq!(status, Some(1));
            assert!(diagnostics.contains("Invalid argument"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(!output.exists());
    assert!(leftovers(out_dir.path()).is_empty());
    assert!(leftovers(work.path()).is_empty());
}

#[test]
fn test_missing_font_is_fatal() {
    let work = tempfile::tempdir().unwrap();
    let mut config = test_config(work.path());
    config.style.font_path = PathBuf::from("/nonexistent/montserrat.ttf");
    let compositor = Arc::new(FakeCompositor::default());
    let pipeline = CaptionPipeline::new(
        &config,
        Arc::new(FakeTranscriber::new(see_you_later())),
        Arc::new(crate::render::FontdueRenderer::new()),
        compositor.clone(),
    )
    .unwrap()
    .with_prober(Arc::new(super::fixtures::FakeProber::hd()));

    let result = pipeline.run(&PathBuf::from("in.mp4"), &work.path().join("o.mp4"), |_| {});
    assert!(matches!(result, Err(CaptionError::RenderAssetMissing(_))));
    assert!(compositor.calls().is_empty());
    assert!(leftovers(work.path()).is_empty());
}

#[test]
fn test_concurrent_runs_are_isolated() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let compositor = Arc::new(FakeCompositor::default());
    let pipeline = Arc::new(pipeline_with(
        &config,
        FakeTranscriber::new(five_words()),
        compositor.clone(),
    ));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pipeline = pipeline.clone();
            let output = work.path().join(format!("out-{}.mp4", i));
            std::thread::spawn(move || pipeline.run(&PathBuf::from("in.mp4"), &output, |_| {}))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let calls = compositor.calls();
    assert_eq!(calls.len(), 4);
    let mut dirs: Vec<_> = calls
        .iter()
        .map(|c| c.image_paths[0].parent().unwrap().to_path_buf())
        .collect();
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), 4, "each run renders into its own directory");
    assert!(calls.iter().all(|c| c.images_present));
}

fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn system_font() -> Option<PathBuf> {
    [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}

/// Real ffmpeg + fontdue + segments file; skipped when the host lacks them
#[test]
fn test_real_ffmpeg_run() {
    let Some(font) = system_font() else {
        return;
    };
    if !ffmpeg_available() {
        return;
    }

    let work = tempfile::tempdir().unwrap();
    let input = work.path().join("clip.mp4");
    let generated = Command::new("ffmpeg")
        .args(["-hide_banner", "-loglevel", "error", "-y"])
        .args(["-f", "lavfi", "-i", "testsrc=size=320x240:rate=10:duration=2"])
        .args(["-f", "lavfi", "-i", "sine=frequency=440:duration=2"])
        .args(["-shortest"])
        .arg(&input)
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    if !generated {
        return;
    }

    std::fs::write(
        work.path().join("clip.mp4.segments.json"),
        r#"{"segments": [{"text": " see you", "start": 0.0, "end": 1.0},
                         {"text": " later friend", "start": 1.0, "end": 2.0}]}"#,
    )
    .unwrap();

    crate::media::init().unwrap();
    let mut config = test_config(&work.path().join("scratch"));
    config.style.font_path = font;
    config.style.font_size = 24.0;
    config.style.canvas_height = 60;
    config.overlay.bottom_margin = 10;

    let pipeline = CaptionPipeline::from_config(&config).unwrap();
    let output = work.path().join("captioned_video.mp4");
    let report = pipeline.run(&input, &output, |_| {}).unwrap();

    assert_eq!(report.chunk_count, 2);
    let probe = crate::media::probe_video(&output).unwrap();
    assert_eq!((probe.width, probe.height), (320, 240));
    assert!(probe.has_audio);
    assert!(leftovers(&work.path().join("scratch")).is_empty());
}
