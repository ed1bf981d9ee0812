//! The Job Store seam.
//!
//! Handlers and the dispatcher only see [`JobStore`]. [`PgJobStore`] is the
//! durable implementation; [`MemoryJobStore`] keeps jobs in process for
//! local development and tests and mirrors the conditional updates of
//! [`JobRepo`] exactly.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use manimflow_core::render_job::{RenderStatus, TerminalOutcome};
use manimflow_core::types::{DbId, JobId};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::job::{JobListQuery, NewRenderJob, RenderJob};
use crate::repositories::JobRepo;
use crate::DbPool;

/// Durable record of render jobs keyed by job id.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a job in `GENERATING`.
    async fn create(&self, input: &NewRenderJob) -> Result<RenderJob, sqlx::Error>;

    async fn find_by_id(&self, id: JobId) -> Result<Option<RenderJob>, sqlx::Error>;

    /// A completed job with a video, for anonymous share views.
    async fn find_shared(&self, id: JobId) -> Result<Option<RenderJob>, sqlx::Error>;

    async fn list_by_owner(
        &self,
        owner_id: DbId,
        params: &JobListQuery,
    ) -> Result<Vec<RenderJob>, sqlx::Error>;

    /// Enter `RENDERING` for a new dispatch, replacing the token of any
    /// dispatch still in flight. `None` if the job is missing.
    async fn begin_render(
        &self,
        id: JobId,
        code: &str,
        token_hash: &str,
    ) -> Result<Option<RenderJob>, sqlx::Error>;

    /// Terminal write, applied only while rendering and (when given) only
    /// for the dispatch whose token digest matches.
    async fn record_outcome(
        &self,
        id: JobId,
        token_hash: Option<&str>,
        outcome: &TerminalOutcome,
    ) -> Result<bool, sqlx::Error>;

    /// Remove all of an owner's jobs and return them.
    async fn delete_by_owner(&self, owner_id: DbId) -> Result<Vec<RenderJob>, sqlx::Error>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// [`JobStore`] backed by the `render_jobs` table.
#[derive(Clone)]
pub struct PgJobStore {
    pool: DbPool,
}

impl PgJobStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, input: &NewRenderJob) -> Result<RenderJob, sqlx::Error> {
        JobRepo::create(&self.pool, input).await
    }

    async fn find_by_id(&self, id: JobId) -> Result<Option<RenderJob>, sqlx::Error> {
        JobRepo::find_by_id(&self.pool, id).await
    }

    async fn find_shared(&self, id: JobId) -> Result<Option<RenderJob>, sqlx::Error> {
        JobRepo::find_shared(&self.pool, id).await
    }

    async fn list_by_owner(
        &self,
        owner_id: DbId,
        params: &JobListQuery,
    ) -> Result<Vec<RenderJob>, sqlx::Error> {
        JobRepo::list_by_owner(&self.pool, owner_id, params).await
    }

    async fn begin_render(
        &self,
        id: JobId,
        code: &str,
        token_hash: &str,
    ) -> Result<Option<RenderJob>, sqlx::Error> {
        JobRepo::begin_render(&self.pool, id, code, token_hash).await
    }

    async fn record_outcome(
        &self,
        id: JobId,
        token_hash: Option<&str>,
        outcome: &TerminalOutcome,
    ) -> Result<bool, sqlx::Error> {
        JobRepo::record_outcome(&self.pool, id, token_hash, outcome).await
    }

    async fn delete_by_owner(&self, owner_id: DbId) -> Result<Vec<RenderJob>, sqlx::Error> {
        JobRepo::delete_by_owner(&self.pool, owner_id).await
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Process-local [`JobStore`]. Jobs are lost on restart.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, RenderJob>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, input: &NewRenderJob) -> Result<RenderJob, sqlx::Error> {
        let now = Utc::now();
        let job = RenderJob {
            id: Uuid::new_v4(),
            owner_id: input.owner_id,
            prompt: input.prompt.clone(),
            code: input.code.clone(),
            status: RenderStatus::Generating,
            video_ref: None,
            thumbnail_ref: None,
            duration_secs: None,
            error_message: None,
            model: input.model.clone(),
            provider_tag: input.provider_tag.clone(),
            dispatch_token_hash: None,
            created_at: now,
            render_started_at: None,
            completed_at: None,
            updated_at: now,
        };
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(job)
    }

    async fn find_by_id(&self, id: JobId) -> Result<Option<RenderJob>, sqlx::Error> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn find_shared(&self, id: JobId) -> Result<Option<RenderJob>, sqlx::Error> {
        Ok(self
            .jobs
            .read()
            .await
            .get(&id)
            .filter(|job| job.status == RenderStatus::Completed && job.video_ref.is_some())
            .cloned())
    }

    async fn list_by_owner(
        &self,
        owner_id: DbId,
        params: &JobListQuery,
    ) -> Result<Vec<RenderJob>, sqlx::Error> {
        let (limit, offset) = params.page();
        let mut jobs: Vec<RenderJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.owner_id == owner_id)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn begin_render(
        &self,
        id: JobId,
        code: &str,
        token_hash: &str,
    ) -> Result<Option<RenderJob>, sqlx::Error> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(None);
        };
        if !job.status.can_transition_to(RenderStatus::Rendering) {
            return Ok(None);
        }

        let now = Utc::now();
        job.status = RenderStatus::Rendering;
        job.code = code.to_string();
        job.dispatch_token_hash = Some(token_hash.to_string());
        job.render_started_at = Some(now);
        job.completed_at = None;
        job.video_ref = None;
        job.thumbnail_ref = None;
        job.duration_secs = None;
        job.error_message = None;
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    async fn record_outcome(
        &self,
        id: JobId,
        token_hash: Option<&str>,
        outcome: &TerminalOutcome,
    ) -> Result<bool, sqlx::Error> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&id) else {
            return Ok(false);
        };
        if job.status != RenderStatus::Rendering {
            return Ok(false);
        }
        if let Some(hash) = token_hash {
            if job.dispatch_token_hash.as_deref() != Some(hash) {
                return Ok(false);
            }
        }
        job.apply_outcome(outcome, Utc::now());
        Ok(true)
    }

    async fn delete_by_owner(&self, owner_id: DbId) -> Result<Vec<RenderJob>, sqlx::Error> {
        let mut jobs = self.jobs.write().await;
        let ids: Vec<JobId> = jobs
            .values()
            .filter(|job| job.owner_id == owner_id)
            .map(|job| job.id)
            .collect();
        Ok(ids.iter().filter_map(|id| jobs.remove(id)).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
