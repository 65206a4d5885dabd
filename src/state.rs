//! Application state management
//!
//! This module defines the AppState structure that holds:
//! - Uploaded caption jobs and their status
//! - The shared caption pipeline
//! - The limit on concurrent pipeline runs
//! - Application configuration

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{CaptionError, Result};
use crate::pipeline::{CaptionPipeline, RunReport, RunStage};

/// Name of the captioned file inside a job directory
pub const OUTPUT_FILE_NAME: &str = "captioned_video.mp4";

/// Where a job is in its lifecycle
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobStatus {
    Uploaded,
    Running {
        stage: RunStage,
    },
    Done {
        chunk_count: usize,
        duration_secs: f64,
        elapsed_secs: f64,
    },
    Failed {
        kind: String,
        message: String,
    },
}

impl JobStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, JobStatus::Running { .. })
    }

    pub fn is_done(&self) -> bool {
        matches!(self, JobStatus::Done { .. })
    }

    pub fn from_result(result: &Result<RunReport>) -> Self {
        match result {
            Ok(report) => JobStatus::Done {
                chunk_count: report.chunk_count,
                duration_secs: report.duration_secs,
                elapsed_secs: report.elapsed_secs,
            },
            Err(e) => JobStatus::Failed {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone)]
struct JobState {
    status: JobStatus,
    updated_at: DateTime<Utc>,
    /// Set once the job is unregistered; no run may start afterwards
    deleted: bool,
}

/// One uploaded video and its captioning state
#[derive(Debug)]
pub struct Job {
    pub id: String,
    /// Private directory holding the upload and the output
    pub dir: PathBuf,
    pub source: PathBuf,
    pub output: PathBuf,
    pub source_bytes: u64,
    pub created_at: DateTime<Utc>,
    state: RwLock<JobState>,
}

/// JSON view of a job
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub job_id: String,
    #[serde(flatten)]
    pub status: JobStatus,
    pub source_bytes: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a job whose upload will be stored as `source.{extension}`
    pub fn new(jobs_root: &Path, extension: &str, source_bytes: u64) -> Self {
        let id = Uuid::new_v4().to_string();
        let dir = jobs_root.join(&id);
        let now = Utc::now();
        Self {
            source: dir.join(format!("source.{}", extension)),
            output: dir.join(OUTPUT_FILE_NAME),
            dir,
            id,
            source_bytes,
            created_at: now,
            state: RwLock::new(JobState {
                status: JobStatus::Uploaded,
                updated_at: now,
                deleted: false,
            }),
        }
    }

    pub fn status(&self) -> JobStatus {
        self.state.read().status.clone()
    }

    pub fn set_status(&self, status: JobStatus) {
        let mut state = self.state.write();
        state.status = status;
        state.updated_at = Utc::now();
    }

    /// Queue a run unless one is already queued or in progress, or the
    /// job has been deleted
    pub fn try_start(&self) -> bool {
        let mut state = self.state.write();
        if state.deleted || state.status.is_running() {
            return false;
        }
        state.status = JobStatus::Running {
            stage: RunStage::Queued,
        };
        state.updated_at = Utc::now();
        true
    }

    /// Mark the job deleted unless a run is queued or in progress
    fn try_mark_deleted(&self) -> bool {
        let mut state = self.state.write();
        if state.status.is_running() {
            return false;
        }
        state.deleted = true;
        true
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.state.read().updated_at
    }

    /// Time since the job last changed
    pub fn idle_for(&self) -> Duration {
        (Utc::now() - self.updated_at())
            .to_std()
            .unwrap_or_default()
    }

    pub fn view(&self) -> JobView {
        let state = self.state.read();
        JobView {
            job_id: self.id.clone(),
            status: state.status.clone(),
            source_bytes: self.source_bytes,
            created_at: self.created_at,
            updated_at: state.updated_at,
        }
    }
}

/// Application state shared across all handlers
pub struct AppState {
    /// Registered jobs (job_id -> Job)
    pub jobs: DashMap<String, Arc<Job>>,

    /// Caption pipeline shared by every run
    pub pipeline: Arc<CaptionPipeline>,

    /// Permits for concurrent pipeline runs
    pub run_slots: Arc<Semaphore>,

    /// Application configuration
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: AppConfig, pipeline: CaptionPipeline) -> Self {
        let slots = config.jobs.max_concurrent_runs.max(1);
        Self {
            jobs: DashMap::new(),
            pipeline: Arc::new(pipeline),
            run_slots: Arc::new(Semaphore::new(slots)),
            config,
        }
    }

    /// Directory under which every job gets its own folder
    pub fn jobs_root(&self) -> PathBuf {
        self.config.jobs.work_dir.join("jobs")
    }

    /// Register a new job
    pub fn register_job(&self, job: Job) -> Arc<Job> {
        let arc = Arc::new(job);
        self.jobs.insert(arc.id.clone(), arc.clone());
        arc
    }

    /// Get a job by ID
    pub fn get_job(&self, job_id: &str) -> Option<Arc<Job>> {
        self.jobs.get(job_id).map(|r| r.clone())
    }

    /// Get a job by ID or fail with `JobNotFound`
    pub fn require_job(&self, job_id: &str) -> Result<Arc<Job>> {
        self.get_job(job_id)
            .ok_or_else(|| CaptionError::JobNotFound(job_id.to_string()))
    }

    /// All jobs, oldest first
    pub fn list_jobs(&self) -> Vec<JobView> {
        let mut views: Vec<JobView> = self.jobs.iter().map(|r| r.value().view()).collect();
        views.sort_by_key(|v| v.created_at);
        views
    }

    /// Remove a job and delete its files.
    ///
    /// Fails with `JobBusy` while a run is queued or in progress, since the
    /// run would recreate the job directory when it delivers its output.
    pub fn remove_job(&self, job_id: &str) -> Result<Arc<Job>> {
        let (_, job) = match self.jobs.remove_if(job_id, |_, job| job.try_mark_deleted()) {
            Some(entry) => entry,
            None if self.jobs.contains_key(job_id) => {
                return Err(CaptionError::JobBusy(job_id.to_string()))
            }
            None => return Err(CaptionError::JobNotFound(job_id.to_string())),
        };
        if let Err(e) = std::fs::remove_dir_all(&job.dir) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove job directory {}: {}", job.dir.display(), e);
            }
        }
        Ok(job)
    }

    /// Remove idle jobs older than the configured TTL. Running jobs stay.
    pub fn cleanup_expired_jobs(&self) -> usize {
        let ttl = Duration::from_secs(self.config.jobs.ttl_secs);
        let expired: Vec<String> = self
            .jobs
            .iter()
            .filter(|r| !r.value().status().is_running() && r.value().idle_for() >= ttl)
            .map(|r| r.key().clone())
            .collect();

        expired
            .iter()
            .filter(|id| self.remove_job(id).is_ok())
            .count()
    }
}
