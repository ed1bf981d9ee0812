//! Handlers for the `/animations` resource.
//!
//! All endpoints require authentication via [`AuthUser`]; a job is only
//! visible to the account that created it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use manimflow_codegen::LlmProvider;
use manimflow_core::error::CoreError;
use manimflow_core::render_job::MIN_PROMPT_LENGTH;
use manimflow_core::types::JobId;
use manimflow_db::models::job::{JobListQuery, NewRenderJob, RenderJob};
use manimflow_db::store::JobStore;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Longest prompt accepted for generation.
const MAX_PROMPT_LENGTH: u64 = 2000;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch a job by ID and verify the caller owns it.
///
/// Returns `NotFound` if the job does not exist and `Forbidden` if it
/// belongs to another account. `action` is used in the error message.
pub(crate) async fn find_and_authorize(
    store: &dyn JobStore,
    job_id: JobId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<RenderJob> {
    let job = store
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::job_not_found(job_id)))?;

    if job.owner_id != auth.user_id {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's animation"
        ))));
    }

    Ok(job)
}

fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    if prompt.trim().chars().count() < MIN_PROMPT_LENGTH {
        let mut err = ValidationError::new("prompt_too_short");
        err.message =
            Some(format!("Prompt must be at least {MIN_PROMPT_LENGTH} characters").into());
        return Err(err);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Generate
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/animations`.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateAnimation {
    #[validate(
        custom(function = "validate_prompt"),
        length(max = MAX_PROMPT_LENGTH, message = "Prompt must be at most 2000 characters")
    )]
    pub prompt: String,
    #[serde(default)]
    pub provider: LlmProvider,
}

/// Response payload of a successful generation.
#[derive(Debug, Serialize)]
pub struct GeneratedAnimation {
    pub job_id: JobId,
    pub code: String,
    pub model: String,
    pub provider: LlmProvider,
    pub tokens_used: u32,
}

/// POST /api/v1/animations
///
/// Generate Manim code for a prompt and record the job in `GENERATING`.
/// Returns 201. Nothing is stored when generation fails.
pub async fn generate_animation(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<GenerateAnimation>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let prompt = input.prompt.trim();

    let generated = state
        .codegen
        .generate(prompt, input.provider)
        .await
        .map_err(|e| {
            tracing::error!(
                user_id = auth.user_id,
                provider = input.provider.as_str(),
                error = %e,
                "Code generation failed",
            );
            AppError::Upstream(e.to_string())
        })?;

    let job = state
        .store
        .create(&NewRenderJob {
            owner_id: auth.user_id,
            prompt: prompt.to_string(),
            code: generated.code,
            model: generated.model,
            provider_tag: generated.provider.as_str().to_string(),
        })
        .await?;

    tracing::info!(
        job_id = %job.id,
        user_id = auth.user_id,
        provider = %job.provider_tag,
        tokens_used = generated.tokens_used,
        "Animation code generated",
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: GeneratedAnimation {
                job_id: job.id,
                code: job.code,
                model: job.model,
                provider: generated.provider,
                tokens_used: generated.tokens_used,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// GET /api/v1/animations
///
/// List the caller's jobs, newest first. Supports `limit` and `offset`.
pub async fn list_animations(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> AppResult<impl IntoResponse> {
    let jobs = state.store.list_by_owner(auth.user_id, &params).await?;
    Ok(Json(DataResponse { data: jobs }))
}

// ---------------------------------------------------------------------------
// Get
// ---------------------------------------------------------------------------

/// GET /api/v1/animations/{id}
pub async fn get_animation(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(state.store.as_ref(), job_id, &auth, "view").await?;
    Ok(Json(DataResponse { data: job }))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/v1/animations/{id}/status
///
/// Current status snapshot with elapsed time, a fixed remaining-time
/// estimate and, for failures, a classified hint.
pub async fn get_animation_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = find_and_authorize(state.store.as_ref(), job_id, &auth, "view").await?;
    Ok(Json(DataResponse {
        data: job.status_view(chrono::Utc::now()),
    }))
}
