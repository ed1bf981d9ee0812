//! The execution-service seam used by the render dispatcher.

use async_trait::async_trait;
use manimflow_core::render_job::RenderQuality;
use manimflow_core::types::JobId;
use serde::Serialize;

use crate::api::RenderApiError;

/// Body of a synchronous render request.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteRequest {
    pub code: String,
    pub quality: RenderQuality,
}

/// Body of an asynchronous render request. The service later POSTs the
/// outcome to `callback_url`.
#[derive(Debug, Clone, Serialize)]
pub struct StartRequest {
    pub code: String,
    pub quality: RenderQuality,
    pub job_id: JobId,
    pub callback_url: String,
}

/// Artifacts reported by a successful synchronous render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderResult {
    pub video_ref: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub duration_secs: Option<f64>,
}

/// An execution service able to render Manim code.
///
/// One instance is constructed at startup and shared by all requests.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    /// Render and wait for the result. Callers bound this with a timeout;
    /// dropping the future cancels the outbound request.
    async fn execute(&self, request: &ExecuteRequest) -> Result<RenderResult, RenderApiError>;

    /// Hand the job to the service and return once it is accepted.
    async fn start(&self, request: &StartRequest) -> Result<(), RenderApiError>;
}
