//! HTTP request handlers
//!
//! Shared error mapping plus the service endpoints.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::CaptionError;
use crate::state::{AppState, Job};

/// HTTP error type
#[derive(Debug)]
pub enum HttpError {
    JobNotFound(String),
    BadRequest(String),
    Conflict(String),
    InternalError(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            HttpError::JobNotFound(id) => (
                StatusCode::NOT_FOUND,
                "job_not_found",
                format!("Job not found: {}", id),
            ),
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            HttpError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            HttpError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        (status, Json(json!({ "error": kind, "message": message }))).into_response()
    }
}

impl From<CaptionError> for HttpError {
    fn from(err: CaptionError) -> Self {
        match err {
            CaptionError::JobNotFound(id) => HttpError::JobNotFound(id),
            CaptionError::JobBusy(id) => {
                HttpError::Conflict(format!("Job {} has a run in progress", id))
            }
            _ => HttpError::InternalError(err.to_string()),
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        HttpError::InternalError(err.to_string())
    }
}

/// Extension trait for AppState
pub trait AppStateExt {
    fn get_job_or_error(&self, job_id: &str) -> Result<Arc<Job>, HttpError>;
}

impl AppStateExt for AppState {
    fn get_job_or_error(&self, job_id: &str) -> Result<Arc<Job>, HttpError> {
        Ok(self.require_job(job_id)?)
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Version endpoint
pub async fn version_check() -> &'static str {
    concat!("caption-server v", env!("CARGO_PKG_VERSION"))
}
