//! Job endpoints: upload, generate, status, preview and download
//!
//! - `POST /jobs` stores the raw request body as the source video
//! - `POST /jobs/{id}/captions` starts a pipeline run in the background
//! - `GET /jobs/{id}` reports the job status
//! - `GET /jobs/{id}/source` and `/output` serve the files

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use std::sync::Arc;

use crate::state::{AppState, Job, JobStatus, JobView, OUTPUT_FILE_NAME};

use super::handlers::{AppStateExt, HttpError};

/// Query parameters for upload
#[derive(Debug, Deserialize)]
pub struct UploadParams {
    /// Original file name; only its extension is used
    pub filename: Option<String>,
}

/// Container extension for a stored upload
fn upload_extension(filename: Option<&str>) -> String {
    filename
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "mp4".to_string())
}

fn video_content_type(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}

/// Upload a video
/// POST /jobs?filename=clip.mov
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<JobView>), HttpError> {
    if body.is_empty() {
        return Err(HttpError::BadRequest("request body is empty".to_string()));
    }

    let extension = upload_extension(params.filename.as_deref());
    let job = Job::new(&state.jobs_root(), &extension, body.len() as u64);

    tokio::fs::create_dir_all(&job.dir).await?;
    tokio::fs::write(&job.source, &body).await?;

    let job = state.register_job(job);
    tracing::info!("Job {} uploaded ({} bytes, .{})", job.id, body.len(), extension);

    Ok((StatusCode::CREATED, Json(job.view())))
}

/// Generate captions
/// POST /jobs/{id}/captions
pub async fn start_captions(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<(StatusCode, Json<JobView>), HttpError> {
    let job = state.get_job_or_error(&job_id)?;

    if !job.try_start() {
        return Err(HttpError::Conflict(format!(
            "Job {} is already running or was deleted",
            job_id
        )));
    }

    let slots = state.run_slots.clone();
    let pipeline = state.pipeline.clone();
    let run_job = job.clone();

    tokio::spawn(async move {
        let permit = match slots.acquire_owned().await {
            Ok(permit) => permit,
            Err(e) => {
                run_job.set_status(JobStatus::Failed {
                    kind: "internal".to_string(),
                    message: e.to_string(),
                });
                return;
            }
        };

        let job = run_job.clone();
        let result = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline.run(&job.source, &job.output, |stage| {
                job.set_status(JobStatus::Running { stage })
            })
        })
        .await;

        let status = match result {
            Ok(run) => {
                if let Err(e) = &run {
                    tracing::error!("Job {} failed: [{}] {}", run_job.id, e.kind(), e);
                }
                JobStatus::from_result(&run)
            }
            Err(e) => JobStatus::Failed {
                kind: "internal".to_string(),
                message: format!("caption task aborted: {}", e),
            },
        };
        run_job.set_status(status);
    });

    Ok((StatusCode::ACCEPTED, Json(job.view())))
}

/// Job status
/// GET /jobs/{id}
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobView>, HttpError> {
    let job = state.get_job_or_error(&job_id)?;
    Ok(Json(job.view()))
}

/// List jobs
/// GET /jobs
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobView>> {
    Json(state.list_jobs())
}

/// Delete a job and its files
/// DELETE /jobs/{id}
///
/// Refused with 409 while a run is queued or in progress.
pub async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, HttpError> {
    tokio::task::spawn_blocking({
        let state = state.clone();
        let job_id = job_id.clone();
        move || state.remove_job(&job_id)
    })
    .await
    .map_err(|e| HttpError::InternalError(e.to_string()))??;

    tracing::info!("Job {} deleted", job_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Uploaded video, for preview
/// GET /jobs/{id}/source
pub async fn job_source(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Response, HttpError> {
    let job = state.get_job_or_error(&job_id)?;
    let data = tokio::fs::read(&job.source).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(video_content_type(&job.source)),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Ok((headers, data).into_response())
}

/// Captioned video download
/// GET /jobs/{id}/output
pub async fn job_output(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Response, HttpError> {
    let job = state.get_job_or_error(&job_id)?;
    if !job.status().is_done() {
        return Err(HttpError::Conflict(format!(
            "Job {} has no captioned output yet",
            job_id
        )));
    }

    let data = tokio::fs::read(&job.output).await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    let disposition = format!("attachment; filename=\"{}\"", OUTPUT_FILE_NAME);
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    Ok((headers, data).into_response())
}
