use thiserror::Error;

/// Main error type for a captioning run
///
/// Every stage fails fast: the first error aborts the run and no output is
/// delivered.
#[derive(Error, Debug)]
pub enum CaptionError {
    /// The transcript contained no words at all
    #[error("Transcript is empty: no words to caption")]
    EmptyTranscript,

    /// The transcript duration or caption count cannot form a timeline
    #[error("Invalid caption timeline: duration={duration_secs}s, captions={captions}")]
    InvalidDuration { duration_secs: f64, captions: usize },

    /// A font or other render asset could not be located or loaded
    #[error("Render asset missing: {0}")]
    RenderAssetMissing(String),

    /// The overlay chain could not be built from the given inputs
    #[error("Overlay graph error: {0}")]
    GraphBuild(String),

    /// The external compositor exited unsuccessfully
    #[error("Compositor failed (status={}): {diagnostics}", describe_status(.status))]
    CompositionExecution {
        status: Option<i32>,
        diagnostics: String,
    },

    /// The transcriber failed or produced malformed segments
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// An error originating from the underlying FFmpeg library
    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] FfmpegError),

    /// The input file has no video stream to caption
    #[error("No video stream found in source file")]
    NoVideoStream,

    /// Encoding or decoding a caption image failed
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No job with the given id is registered
    #[error("Job not found: {0}")]
    JobNotFound(String),

    /// The job has a run queued or in progress
    #[error("Job is busy: {0}")]
    JobBusy(String),
}

impl CaptionError {
    /// Stable machine-readable tag for this error
    pub fn kind(&self) -> &'static str {
        match self {
            CaptionError::EmptyTranscript => "empty_transcript",
            CaptionError::InvalidDuration { .. } => "invalid_duration",
            CaptionError::RenderAssetMissing(_) => "render_asset_missing",
            CaptionError::GraphBuild(_) => "graph_build",
            CaptionError::CompositionExecution { .. } => "composition_execution",
            CaptionError::Transcription(_) => "transcription",
            CaptionError::Ffmpeg(_) => "ffmpeg",
            CaptionError::NoVideoStream => "no_video_stream",
            CaptionError::Image(_) => "image",
            CaptionError::Io(_) => "io",
            CaptionError::Config(_) => "config",
            CaptionError::JobNotFound(_) => "job_not_found",
            CaptionError::JobBusy(_) => "job_busy",
        }
    }
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

/// FFmpeg-specific errors
#[derive(Error, Debug)]
pub enum FfmpegError {
    #[error("FFmpeg initialization failed: {0}")]
    InitFailed(String),

    #[error("Failed to open input file: {0}")]
    OpenInput(String),

    #[error("Failed to find decoder: codec_id={0}")]
    DecoderNotFound(String),

    #[error("Failed to create resampler: {0}")]
    ResamplerCreate(String),

    #[error("Failed to decode packet: {0}")]
    DecodePacket(String),

    #[error("Failed to read frame: {0}")]
    ReadFrame(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CaptionError>;
