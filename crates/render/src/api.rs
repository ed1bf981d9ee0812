//! REST API client for the execution service HTTP endpoints.
//!
//! Wraps `POST /execute` (blocking render) and `POST /execute/async`
//! (accepted now, outcome delivered to a callback) using [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::backend::{ExecuteRequest, RenderBackend, RenderResult, StartRequest};

/// Upper bound on the asynchronous start call. The service only has to
/// accept the job, not render it.
const START_TIMEOUT: Duration = Duration::from_secs(30);

/// Message used when a failed response carries no usable body.
const DEFAULT_RENDER_ERROR: &str = "Failed to render video";

/// HTTP client for a single execution service instance.
pub struct RenderServiceApi {
    client: reqwest::Client,
    api_url: String,
}

/// Response of `POST /execute`.
#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    thumbnail_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

/// Errors from the execution service REST layer.
#[derive(Debug, thiserror::Error)]
pub enum RenderApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The service returned a non-2xx status code.
    #[error("Render service error ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Error detail extracted from the body.
        message: String,
    },

    /// The service completed the request but reported a render failure.
    #[error("Render failed: {0}")]
    Reported(String),
}

impl RenderApiError {
    /// Text to store on the job: the service's own words when it produced
    /// any, otherwise a transport description.
    pub fn failure_message(&self) -> String {
        match self {
            Self::Request(e) => format!("Render service unreachable: {e}"),
            Self::ApiError { message, .. } | Self::Reported(message) => message.clone(),
        }
    }
}

impl RenderServiceApi {
    /// Create a new API client for an execution service.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:8000`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code, turning failures into
    /// [`RenderApiError::ApiError`] with the extracted detail.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, RenderApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderApiError::ApiError {
                status: status.as_u16(),
                message: extract_detail(&body),
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RenderBackend for RenderServiceApi {
    async fn execute(&self, request: &ExecuteRequest) -> Result<RenderResult, RenderApiError> {
        let response = self
            .client
            .post(format!("{}/execute", self.api_url))
            .json(request)
            .send()
            .await?;

        let body: ExecuteResponse = Self::ensure_success(response).await?.json().await?;
        into_result(body)
    }

    async fn start(&self, request: &StartRequest) -> Result<(), RenderApiError> {
        let response = self
            .client
            .post(format!("{}/execute/async", self.api_url))
            .timeout(START_TIMEOUT)
            .json(request)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        tracing::debug!(job_id = %request.job_id, "Render service accepted job");
        Ok(())
    }
}

fn into_result(body: ExecuteResponse) -> Result<RenderResult, RenderApiError> {
    if !body.success {
        let message = body
            .error
            .or(body.message)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RENDER_ERROR.to_string());
        return Err(RenderApiError::Reported(message));
    }
    Ok(RenderResult {
        video_ref: body.video_url,
        thumbnail_ref: body.thumbnail_url,
        duration_secs: body.duration,
    })
}

/// Pull a human-readable message out of an error body.
///
/// The service answers failures with `{"detail": "..."}`; anything else is
/// used verbatim.
fn extract_detail(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return DEFAULT_RENDER_ERROR.to_string();
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.to_string(),
    }
}
