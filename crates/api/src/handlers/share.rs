//! Anonymous read path for shared animations.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use manimflow_core::error::CoreError;
use manimflow_core::types::JobId;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Public view of a finished animation.
#[derive(Debug, Serialize)]
pub struct SharedAnimation {
    pub job_id: JobId,
    pub prompt: String,
    pub video_ref: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub duration_secs: Option<f64>,
}

/// GET /api/v1/share/{id}
///
/// Only completed animations with a video are visible; anything else is
/// reported as not found.
pub async fn get_shared(
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<impl IntoResponse> {
    let job = state
        .store
        .find_shared(job_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::job_not_found(job_id)))?;

    Ok(Json(DataResponse {
        data: SharedAnimation {
            job_id: job.id,
            prompt: job.prompt,
            video_ref: job.video_ref,
            thumbnail_ref: job.thumbnail_ref,
            duration_secs: job.duration_secs,
        },
    }))
}
