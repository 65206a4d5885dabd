//! Upload → generate → download over the HTTP router

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;

use crate::http::create_router;
use crate::state::AppState;

use super::fixtures::{
    fake_pipeline, leftovers, pipeline_with, see_you_later, test_config, FakeCompositor,
    FakeTranscriber, Gate,
};

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::body::Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}

async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, body) = send(app, request).await;
    let value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, value)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(body)
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn upload(app: &Router) -> String {
    let (status, created) = send_json(app, post("/jobs", Body::from("bytes"))).await;
    assert_eq!(status, StatusCode::CREATED);
    created["job_id"].as_str().unwrap().to_string()
}

async fn wait_for_stage(app: &Router, job_id: &str, stage: &str) {
    for _ in 0..200 {
        let (_, json) = send_json(app, get(&format!("/jobs/{}", job_id))).await;
        if json["stage"] == stage {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {} never reached {}", job_id, stage);
}

async fn wait_for_terminal(app: &Router, job_id: &str) -> serde_json::Value {
    for _ in 0..200 {
        let (_, json) = send_json(app, get(&format!("/jobs/{}", job_id))).await;
        if json["status"] == "done" || json["status"] == "failed" {
            return json;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {} never finished", job_id);
}

#[tokio::test]
async fn test_upload_generate_download() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let state = Arc::new(AppState::new(config.clone(), fake_pipeline(&config)));
    let app = create_router(state.clone());

    let (status, created) = send_json(
        &app,
        post("/jobs?filename=holiday.mov", Body::from("not really a video")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "uploaded");
    let job_id = created["job_id"].as_str().unwrap().to_string();

    // Output is not ready before a run
    let (status, _) = send(&app, get(&format!("/jobs/{}/output", job_id))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Source preview returns the upload untouched
    let (status, source) = send(&app, get(&format!("/jobs/{}/source", job_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&source[..], b"not really a video");

    let (status, started) = send_json(
        &app,
        post(&format!("/jobs/{}/captions", job_id), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(started["status"], "running");

    let finished = wait_for_terminal(&app, &job_id).await;
    assert_eq!(finished["status"], "done", "{}", finished);
    assert_eq!(finished["chunk_count"], 2);

    let response = app
        .clone()
        .oneshot(get(&format!("/jobs/{}/output", job_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "video/mp4");
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(std::str::from_utf8(&body).unwrap().contains("[cap1]"));

    let (status, listed) = send_json(&app, get("/jobs")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, _) = send(&app, delete(&format!("/jobs/{}", job_id))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(state.get_job(&job_id).is_none());

    let (status, _) = send(&app, get(&format!("/jobs/{}", job_id))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_run_reports_kind() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let pipeline = pipeline_with(
        &config,
        FakeTranscriber::new(vec![]),
        Arc::new(FakeCompositor::default()),
    );
    let app = create_router(Arc::new(AppState::new(config, pipeline)));

    let (_, created) = send_json(&app, post("/jobs", Body::from("bytes"))).await;
    let job_id = created["job_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        post(&format!("/jobs/{}/captions", job_id), Body::empty()),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let finished = wait_for_terminal(&app, &job_id).await;
    assert_eq!(finished["status"], "failed");
    assert_eq!(finished["kind"], "empty_transcript");

    let (status, _) = send(&app, get(&format!("/jobs/{}/output", job_id))).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_empty_upload_is_rejected() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let app = create_router(Arc::new(AppState::new(config.clone(), fake_pipeline(&config))));

    let (status, json) = send_json(&app, post("/jobs", Body::empty())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_refused_while_running() {
    let work = tempfile::tempdir().unwrap();
    let config = test_config(work.path());
    let gate = Arc::new(Gate::default());
    let pipeline = pipeline_with(
        &config,
        FakeTranscriber::gated(see_you_later(), gate.clone()),
        Arc::new(FakeCompositor::default()),
    );
    let state = Arc::new(AppState::new(config, pipeline));
    let app = create_router(state.clone());

    let job_id = upload(&app).await;
    let job_dir = state.get_job(&job_id).unwrap().dir.clone();
    send(&app, post(&format!("/jobs/{}/captions", job_id), Body::empty())).await;
    wait_for_stage(&app, &job_id, "transcribing").await;

    let (status, json) = send_json(&app, delete(&format!("/jobs/{}", job_id))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"], "conflict");
    assert!(state.get_job(&job_id).is_some());

    gate.open();
    let finished = wait_for_terminal(&app, &job_id).await;
    assert_eq!(finished["status"], "done", "{}", finished);

    let (status, _) = send(&app, delete(&format!("/jobs/{}", job_id))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(!job_dir.exists());
    assert!(leftovers(&state.jobs_root()).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_run_waits_for_a_slot() {
    let work = tempfile::tempdir().unwrap();
    let mut config = test_config(work.path());
    config.jobs.max_concurrent_runs = 1;
    let gate = Arc::new(Gate::default());
    let pipeline = pipeline_with(
        &config,
        FakeTranscriber::gated(see_you_later(), gate.clone()),
        Arc::new(FakeCompositor::default()),
    );
    let app = create_router(Arc::new(AppState::new(config, pipeline)));

    let first = upload(&app).await;
    let second = upload(&app).await;
    send(&app, post(&format!("/jobs/{}/captions", first), Body::empty())).await;
    wait_for_stage(&app, &first, "transcribing").await;

    let (status, started) =
        send_json(&app, post(&format!("/jobs/{}/captions", second), Body::empty())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(started["stage"], "queued");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let (_, waiting) = send_json(&app, get(&format!("/jobs/{}", second))).await;
    assert_eq!(waiting["stage"], "queued");

    gate.open();
    assert_eq!(wait_for_terminal(&app, &first).await["status"], "done");
    assert_eq!(wait_for_terminal(&app, &second).await["status"], "done");
}
