//! Callback receiver for asynchronous renders.
//!
//! The execution service POSTs the outcome here. The endpoint carries no
//! user authentication; when a webhook secret is configured the
//! `x-webhook-secret` header must match it.

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use manimflow_core::error::CoreError;
use manimflow_core::hashing::{secrets_match, sha256_hex};
use manimflow_core::render_job::{TerminalOutcome, MISSING_VIDEO_MESSAGE};
use manimflow_core::types::JobId;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Header carrying the shared webhook secret.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// Query string of the callback URL.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    /// Per-dispatch token embedded in the callback URL.
    pub token: Option<String>,
}

/// Outcome reported by the execution service.
#[derive(Debug, Deserialize)]
pub struct RenderCallback {
    #[serde(alias = "animation_id", alias = "jobId")]
    pub job_id: Option<JobId>,
    pub success: bool,
    #[serde(alias = "video_url", alias = "videoRef")]
    pub video_ref: Option<String>,
    #[serde(alias = "thumbnail_url", alias = "thumbnailRef")]
    pub thumbnail_ref: Option<String>,
    #[serde(alias = "duration", alias = "durationSeconds")]
    pub duration_secs: Option<f64>,
    #[serde(alias = "error", alias = "errorMessage")]
    pub error_message: Option<String>,
}

/// Callback acknowledgement. `applied` is false for duplicate, replayed or
/// superseded callbacks.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub acknowledged: bool,
    pub applied: bool,
}

/// POST /api/v1/render/callback
///
/// The body is parsed only after the webhook secret is checked, so an
/// unauthenticated caller always gets 401.
pub async fn render_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<CallbackAck>> {
    if let Some(expected) = state.config.render.webhook_secret.as_deref() {
        let provided = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !secrets_match(provided, expected) {
            tracing::warn!("Render callback rejected: bad webhook secret");
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid webhook secret".into(),
            )));
        }
    }

    let body: RenderCallback = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid callback body: {e}")))?;

    let job_id = body
        .job_id
        .ok_or_else(|| AppError::BadRequest("job_id is required".into()))?;

    let outcome = if body.success {
        TerminalOutcome::completed(body.video_ref, body.thumbnail_ref, body.duration_secs)
            .map_err(|_| AppError::BadRequest(MISSING_VIDEO_MESSAGE.into()))?
    } else {
        TerminalOutcome::failed(body.error_message)
    };

    if state.store.find_by_id(job_id).await?.is_none() {
        return Err(AppError::Core(CoreError::job_not_found(job_id)));
    }

    let token_hash = query
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(|t| sha256_hex(t.as_bytes()));

    let applied = state
        .store
        .record_outcome(job_id, token_hash.as_deref(), &outcome)
        .await?;

    if applied {
        tracing::info!(job_id = %job_id, status = %outcome.status(), "Render callback applied");
    } else {
        tracing::warn!(
            job_id = %job_id,
            status = %outcome.status(),
            has_token = token_hash.is_some(),
            "Render callback ignored: job not rendering or dispatch superseded",
        );
    }

    Ok(Json(CallbackAck {
        acknowledged: true,
        applied,
    }))
}
