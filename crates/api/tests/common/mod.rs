#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use manimflow_api::auth::jwt::{generate_access_token, JwtConfig};
use manimflow_api::config::{RenderConfig, ServerConfig};
use manimflow_api::engine::dispatcher::{DispatchMode, RenderDispatcher};
use manimflow_api::router::build_app_router;
use manimflow_api::state::AppState;
use manimflow_codegen::{CodeGenerator, CodegenError, GeneratedCode, LlmProvider};
use manimflow_core::types::{DbId, JobId};
use manimflow_db::models::job::{NewRenderJob, RenderJob};
use manimflow_db::store::{JobStore, MemoryJobStore};
use manimflow_render::{ExecuteRequest, RenderApiError, RenderBackend, RenderResult, StartRequest};
use manimflow_storage::{ArtifactCleaner, CleanupReport};
use serde_json::Value;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";
pub const GENERATED_CODE: &str = "from manim import *\n\nclass Demo(Scene):\n    pass";

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// How the fake execution service behaves.
#[derive(Debug, Clone)]
pub enum RenderScript {
    /// `execute` returns these artifacts; `start` accepts.
    Succeed(RenderResult),
    /// `execute` reports this failure; `start` accepts.
    Fail(String),
    /// `execute` never finishes within a test's lifetime.
    Hang,
    /// `start` is refused with a 503 carrying this detail.
    RejectStart(String),
}

pub struct FakeRenderBackend {
    script: RenderScript,
    pub executed: Mutex<Vec<ExecuteRequest>>,
    pub started: Mutex<Vec<StartRequest>>,
}

impl FakeRenderBackend {
    pub fn new(script: RenderScript) -> Self {
        Self {
            script,
            executed: Mutex::new(Vec::new()),
            started: Mutex::new(Vec::new()),
        }
    }

    /// Callback token of the most recent accepted start call.
    pub fn last_callback_token(&self) -> String {
        let started = self.started.lock().unwrap();
        let url = &started.last().expect("no start call recorded").callback_url;
        url.split("token=").nth(1).expect("callback url has a token").to_string()
    }
}

#[async_trait]
impl RenderBackend for FakeRenderBackend {
    async fn execute(&self, request: &ExecuteRequest) -> Result<RenderResult, RenderApiError> {
        self.executed.lock().unwrap().push(request.clone());
        match &self.script {
            RenderScript::Succeed(result) => Ok(result.clone()),
            RenderScript::Fail(message) => Err(RenderApiError::Reported(message.clone())),
            RenderScript::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(RenderResult::default())
            }
            RenderScript::RejectStart(_) => Ok(RenderResult::default()),
        }
    }

    async fn start(&self, request: &StartRequest) -> Result<(), RenderApiError> {
        if let RenderScript::RejectStart(message) = &self.script {
            return Err(RenderApiError::ApiError {
                status: 503,
                message: message.clone(),
            });
        }
        self.started.lock().unwrap().push(request.clone());
        Ok(())
    }
}

/// Code generator returning [`GENERATED_CODE`], or failing when asked to.
pub struct FakeCodeGenerator {
    pub fail: bool,
}

#[async_trait]
impl CodeGenerator for FakeCodeGenerator {
    async fn generate(
        &self,
        _prompt: &str,
        provider: LlmProvider,
    ) -> Result<GeneratedCode, CodegenError> {
        if self.fail {
            return Err(CodegenError::ApiError {
                status: 429,
                body: "rate limited".into(),
            });
        }
        Ok(GeneratedCode {
            code: GENERATED_CODE.into(),
            model: "test-model".into(),
            provider,
            tokens_used: 128,
        })
    }
}

/// Cleaner that records every reference it is given.
#[derive(Default)]
pub struct RecordingCleaner {
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl ArtifactCleaner for RecordingCleaner {
    async fn cleanup(&self, refs: &[String]) -> CleanupReport {
        self.seen.lock().unwrap().extend(refs.iter().cloned());
        CleanupReport {
            deleted: refs.len(),
            failed: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Knobs for [`TestApp::build`].
pub struct TestOptions {
    pub mode: DispatchMode,
    pub script: RenderScript,
    pub render_timeout: Duration,
    pub webhook_secret: Option<String>,
    pub codegen_fails: bool,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Async,
            script: RenderScript::Succeed(RenderResult {
                video_ref: Some("https://cdn.example/v1.mp4".into()),
                thumbnail_ref: Some("https://cdn.example/t1.png".into()),
                duration_secs: Some(6.0),
            }),
            render_timeout: Duration::from_secs(5),
            webhook_secret: None,
            codegen_fails: false,
        }
    }
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(options: &TestOptions) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
        render: RenderConfig {
            service_url: "http://render.invalid".into(),
            sync: options.mode == DispatchMode::Sync,
            timeout_secs: options.render_timeout.as_secs(),
            public_base_url: Some("https://api.manimflow.test".into()),
            deployment_host: None,
            webhook_secret: options.webhook_secret.clone(),
        },
        database_url: None,
    }
}

/// The full router plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryJobStore>,
    pub backend: Arc<FakeRenderBackend>,
    pub cleaner: Arc<RecordingCleaner>,
    pub dispatcher: Arc<RenderDispatcher>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(TestOptions::default())
    }

    /// Build the application router with all middleware layers, backed by
    /// the in-memory store and fake collaborators.
    pub fn build(options: TestOptions) -> Self {
        let config = test_config(&options);
        let store = Arc::new(MemoryJobStore::new());
        let backend = Arc::new(FakeRenderBackend::new(options.script.clone()));
        let cleaner = Arc::new(RecordingCleaner::default());
        let dispatcher = Arc::new(RenderDispatcher::new(
            store.clone(),
            backend.clone(),
            options.mode,
            options.render_timeout,
        ));

        let state = AppState {
            store: store.clone(),
            config: Arc::new(config.clone()),
            dispatcher: Arc::clone(&dispatcher),
            codegen: Arc::new(FakeCodeGenerator {
                fail: options.codegen_fails,
            }),
            cleaner: cleaner.clone(),
        };

        Self {
            router: build_app_router(state, &config),
            store,
            backend,
            cleaner,
            dispatcher,
        }
    }

    /// Insert a job in `GENERATING` owned by `owner_id`.
    pub async fn seed_job(&self, owner_id: DbId) -> RenderJob {
        self.store
            .create(&NewRenderJob {
                owner_id,
                prompt: "a square rotating into a circle".into(),
                code: GENERATED_CODE.into(),
                model: "test-model".into(),
                provider_tag: "groq".into(),
            })
            .await
            .unwrap()
    }

    pub async fn job(&self, id: JobId) -> Option<RenderJob> {
        self.store.find_by_id(id).await.unwrap()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<DbId>,
        body: Option<Value>,
    ) -> Response {
        self.send_with_headers(method, uri, user, body, &[]).await
    }

    pub async fn send_with_headers(
        &self,
        method: Method,
        uri: &str,
        user: Option<DbId>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user {
            builder = builder.header("authorization", format!("Bearer {}", token_for(user_id)));
        }
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a body verbatim, for payloads that are not valid JSON.
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        body: &str,
        headers: &[(&str, &str)],
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// GET the status endpoint and return the `data` payload.
    pub async fn status(&self, id: JobId, user: DbId) -> Value {
        let response = self
            .send(Method::GET, &format!("/api/v1/animations/{id}/status"), Some(user), None)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        body_json(response).await["data"].clone()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn token_for(user_id: DbId) -> String {
    let config = JwtConfig {
        secret: TEST_JWT_SECRET.to_string(),
        access_token_expiry_mins: 15,
    };
    generate_access_token(user_id, &config).unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
