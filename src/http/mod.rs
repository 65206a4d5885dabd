//! HTTP server module
//!
//! This module handles HTTP request routing and handling:
//! - Axum router with the job endpoints
//! - Upload, caption generation, status, preview and download handlers
//! - Error mapping to JSON responses
//! - CORS and request tracing middleware

pub mod handlers;
pub mod jobs;
pub mod routes;

pub use routes::create_router;
