//! Handler for `POST /api/v1/render`.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use manimflow_core::callback_url::{resolve_base, CallbackBaseSources};
use manimflow_core::error::CoreError;
use manimflow_core::render_job::RenderQuality;
use manimflow_core::types::JobId;
use serde::Deserialize;

use crate::config::RenderConfig;
use crate::engine::dispatcher::{DispatchOutcome, DispatchRequest};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for starting a render.
#[derive(Debug, Deserialize)]
pub struct StartRender {
    #[serde(alias = "animation_id")]
    pub job_id: Option<JobId>,
    pub code: Option<String>,
    #[serde(default)]
    pub quality: RenderQuality,
}

/// POST /api/v1/render
///
/// Synchronous mode returns 200 with the finished artifacts; asynchronous
/// mode returns 202 once the job is `RENDERING`.
pub async fn start_render(
    auth: AuthUser,
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<StartRender>,
) -> AppResult<impl IntoResponse> {
    let job_id = input
        .job_id
        .ok_or_else(|| AppError::BadRequest("job_id is required".into()))?;
    let code = input
        .code
        .ok_or_else(|| AppError::Core(CoreError::Validation("code is required".into())))?;

    let request = DispatchRequest {
        job_id,
        owner_id: auth.user_id,
        code,
        quality: input.quality,
        callback_base: callback_base(&state.config.render, &headers),
    };

    let outcome = state.dispatcher.dispatch(request).await?;
    let status = match outcome {
        DispatchOutcome::Completed { .. } => StatusCode::OK,
        DispatchOutcome::Accepted { .. } => StatusCode::ACCEPTED,
    };
    Ok((status, Json(DataResponse { data: outcome })))
}

/// Public base URL for this dispatch's callback.
fn callback_base(config: &RenderConfig, headers: &HeaderMap) -> String {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    resolve_base(&CallbackBaseSources {
        public_base_url: config.public_base_url.as_deref(),
        deployment_host: config.deployment_host.as_deref(),
        request_host: header("x-forwarded-host").or_else(|| header("host")),
        request_proto: header("x-forwarded-proto"),
    })
}
