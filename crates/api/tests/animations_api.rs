//! Integration tests for generation, listing, sharing, account deletion and
//! the health endpoint.

mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, TestApp, TestOptions, GENERATED_CODE};
use manimflow_core::render_job::{RenderStatus, TerminalOutcome};
use manimflow_db::store::JobStore;
use serde_json::json;

const OWNER: i64 = 11;
const STRANGER: i64 = 12;

/// Drive a seeded job to `COMPLETED` through the store.
async fn complete(app: &TestApp, job_id: uuid::Uuid, video: &str, thumb: Option<&str>) {
    app.store.begin_render(job_id, GENERATED_CODE, "hash").await.unwrap();
    let outcome =
        TerminalOutcome::completed(Some(video.into()), thumb.map(str::to_string), Some(3.0))
            .unwrap();
    assert!(app
        .store
        .record_outcome(job_id, Some("hash"), &outcome)
        .await
        .unwrap());
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_creates_job_in_generating() {
    let app = TestApp::new();

    let response = app
        .send(
            Method::POST,
            "/api/v1/animations",
            Some(OWNER),
            Some(json!({ "prompt": "  a red circle turning into a square  ", "provider": "gemini" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["code"], GENERATED_CODE);
    assert_eq!(data["provider"], "gemini");
    assert_eq!(data["tokens_used"], 128);

    let job_id: uuid::Uuid = serde_json::from_value(data["job_id"].clone()).unwrap();
    let job = app.job(job_id).await.unwrap();
    assert_eq!(job.status, RenderStatus::Generating);
    assert_eq!(job.owner_id, OWNER);
    assert_eq!(job.prompt, "a red circle turning into a square");
    assert_eq!(job.provider_tag, "gemini");
}

#[tokio::test]
async fn short_prompt_is_rejected() {
    let app = TestApp::new();
    let response = app
        .send(
            Method::POST,
            "/api/v1/animations",
            Some(OWNER),
            Some(json!({ "prompt": "  circle  " })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn generation_failure_creates_nothing() {
    let app = TestApp::build(TestOptions {
        codegen_fails: true,
        ..TestOptions::default()
    });

    let response = app
        .send(
            Method::POST,
            "/api/v1/animations",
            Some(OWNER),
            Some(json!({ "prompt": "a long enough prompt for generation" })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["code"], "UPSTREAM_ERROR");

    let response = app
        .send(Method::GET, "/api/v1/animations", Some(OWNER), None)
        .await;
    assert_eq!(body_json(response).await["data"], json!([]));
}

// ---------------------------------------------------------------------------
// List / get
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_shows_only_own_jobs() {
    let app = TestApp::new();
    let mine = app.seed_job(OWNER).await;
    app.seed_job(STRANGER).await;

    let response = app
        .send(Method::GET, "/api/v1/animations?limit=10", Some(OWNER), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    let jobs = data.as_array().unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["id"], mine.id.to_string());
    assert_eq!(jobs[0]["status"], "GENERATING");
    assert!(jobs[0].get("dispatch_token_hash").is_none());
}

#[tokio::test]
async fn get_checks_ownership() {
    let app = TestApp::new();
    let job = app.seed_job(OWNER).await;
    let uri = format!("/api/v1/animations/{}", job.id);

    let response = app.send(Method::GET, &uri, Some(OWNER), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["prompt"], job.prompt);

    let response = app.send(Method::GET, &uri, Some(STRANGER), None).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .send(
            Method::GET,
            &format!("/api/v1/animations/{}", uuid::Uuid::new_v4()),
            Some(OWNER),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Share
// ---------------------------------------------------------------------------

#[tokio::test]
async fn share_exposes_only_completed_jobs() {
    let app = TestApp::new();
    let done = app.seed_job(OWNER).await;
    let pending = app.seed_job(OWNER).await;
    complete(&app, done.id, "https://cdn/v1.mp4", None).await;

    let response = app
        .send(Method::GET, &format!("/api/v1/share/{}", done.id), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();
    assert_eq!(data["video_ref"], "https://cdn/v1.mp4");
    assert_eq!(data["prompt"], done.prompt);
    assert!(data.get("owner_id").is_none());

    let response = app
        .send(Method::GET, &format!("/api/v1/share/{}", pending.id), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Account deletion
// ---------------------------------------------------------------------------

#[tokio::test]
async fn account_deletion_removes_jobs_and_artifacts() {
    let app = TestApp::new();
    let first = app.seed_job(OWNER).await;
    let second = app.seed_job(OWNER).await;
    let other = app.seed_job(STRANGER).await;
    complete(&app, first.id, "https://cdn/v1.mp4", Some("https://cdn/t1.png")).await;
    complete(&app, other.id, "https://cdn/other.mp4", None).await;

    let response = app
        .send(Method::DELETE, "/api/v1/account", Some(OWNER), None)
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let mut seen = app.cleaner.seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["https://cdn/t1.png", "https://cdn/v1.mp4"]);

    assert!(app.job(first.id).await.is_none());
    assert!(app.job(second.id).await.is_none());
    assert!(app.job(other.id).await.is_some());
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok() {
    let app = TestApp::new();
    let response = app.send(Method::GET, "/health", None, None).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = TestApp::new();
    let response = app
        .send(Method::GET, "/this-route-does-not-exist", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
