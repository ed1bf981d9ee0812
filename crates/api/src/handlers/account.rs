//! Account-level operations.

use axum::extract::State;
use axum::http::StatusCode;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// DELETE /api/v1/account
///
/// Remove all of the caller's jobs, then delete their stored artifacts.
/// Artifact cleanup is best-effort and never fails the request.
pub async fn delete_account(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<StatusCode> {
    let removed = state.store.delete_by_owner(auth.user_id).await?;

    let refs: Vec<String> = removed
        .iter()
        .flat_map(|job| job.artifact_refs())
        .map(str::to_string)
        .collect();

    let report = state.cleaner.cleanup(&refs).await;

    tracing::info!(
        user_id = auth.user_id,
        jobs_deleted = removed.len(),
        artifacts = refs.len(),
        artifacts_deleted = report.deleted,
        artifacts_failed = report.failed,
        "Account data deleted",
    );

    Ok(StatusCode::NO_CONTENT)
}
