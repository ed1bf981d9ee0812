//! Repository for the `render_jobs` table.
//!
//! Every status transition is a single conditional `UPDATE`, so the row's
//! own atomicity is what serializes the dispatcher, the callback receiver
//! and the dispatch-failure handler.

use manimflow_core::render_job::{RenderStatus, TerminalOutcome};
use manimflow_core::types::{DbId, JobId};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::job::{JobListQuery, NewRenderJob, RenderJob};

/// Column list for `render_jobs` queries.
const COLUMNS: &str = "\
    id, owner_id, prompt, code, status_id, \
    video_ref, thumbnail_ref, duration_secs, error_message, \
    model, provider_tag, dispatch_token_hash, \
    created_at, render_started_at, completed_at, updated_at";

/// Provides queries for render jobs.
pub struct JobRepo;

impl JobRepo {
    /// Insert a freshly generated job in `GENERATING`.
    pub async fn create(pool: &PgPool, input: &NewRenderJob) -> Result<RenderJob, sqlx::Error> {
        let query = format!(
            "INSERT INTO render_jobs (id, owner_id, prompt, code, status_id, model, provider_tag) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RenderJob>(&query)
            .bind(Uuid::new_v4())
            .bind(input.owner_id)
            .bind(&input.prompt)
            .bind(&input.code)
            .bind(RenderStatus::Generating.id())
            .bind(&input.model)
            .bind(&input.provider_tag)
            .fetch_one(pool)
            .await
    }

    /// Find a job by its ID.
    pub async fn find_by_id(pool: &PgPool, id: JobId) -> Result<Option<RenderJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM render_jobs WHERE id = $1");
        sqlx::query_as::<_, RenderJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a job that may be shown on the public share page: completed
    /// with a video.
    pub async fn find_shared(pool: &PgPool, id: JobId) -> Result<Option<RenderJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM render_jobs \
             WHERE id = $1 AND status_id = $2 AND video_ref IS NOT NULL"
        );
        sqlx::query_as::<_, RenderJob>(&query)
            .bind(id)
            .bind(RenderStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }

    /// List an owner's jobs, newest first.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: DbId,
        params: &JobListQuery,
    ) -> Result<Vec<RenderJob>, sqlx::Error> {
        let (limit, offset) = params.page();
        let query = format!(
            "SELECT {COLUMNS} FROM render_jobs \
             WHERE owner_id = $1 \
             ORDER BY created_at DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, RenderJob>(&query)
            .bind(owner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Move a job into `RENDERING` for a new dispatch.
    ///
    /// Stores the code being rendered and the callback token digest, stamps
    /// `render_started_at` and clears any previous outcome. A job that is
    /// already rendering gets the new token, superseding the old dispatch.
    /// Returns `None` if the job does not exist.
    pub async fn begin_render(
        pool: &PgPool,
        id: JobId,
        code: &str,
        token_hash: &str,
    ) -> Result<Option<RenderJob>, sqlx::Error> {
        let query = format!(
            "UPDATE render_jobs \
             SET status_id = $2, code = $3, dispatch_token_hash = $4, \
                 render_started_at = NOW(), completed_at = NULL, \
                 video_ref = NULL, thumbnail_ref = NULL, duration_secs = NULL, \
                 error_message = NULL \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RenderJob>(&query)
            .bind(id)
            .bind(RenderStatus::Rendering.id())
            .bind(code)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Write a terminal outcome if the job is still rendering.
    ///
    /// When `token_hash` is given, the write also requires it to match the
    /// current dispatch. Returns `true` if the row changed.
    pub async fn record_outcome(
        pool: &PgPool,
        id: JobId,
        token_hash: Option<&str>,
        outcome: &TerminalOutcome,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE render_jobs \
             SET status_id = $2, video_ref = $3, thumbnail_ref = $4, \
                 duration_secs = $5, error_message = $6, completed_at = NOW() \
             WHERE id = $1 AND status_id = $7 \
               AND ($8::TEXT IS NULL OR dispatch_token_hash = $8)",
        )
        .bind(id)
        .bind(outcome.status().id())
        .bind(outcome.video_ref())
        .bind(outcome.thumbnail_ref())
        .bind(outcome.duration_secs())
        .bind(outcome.error_message())
        .bind(RenderStatus::Rendering.id())
        .bind(token_hash)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every job owned by `owner_id`, returning the removed rows so
    /// their artifacts can be cleaned up.
    pub async fn delete_by_owner(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<RenderJob>, sqlx::Error> {
        let query = format!("DELETE FROM render_jobs WHERE owner_id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, RenderJob>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }
}
