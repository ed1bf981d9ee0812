//! Render dispatcher.
//!
//! Every dispatch writes `RENDERING` before the execution service is
//! contacted and ends with at most one terminal write. Each dispatch gets a
//! fresh callback token; only its SHA-256 digest is stored, and every
//! terminal write for the dispatch is conditioned on that digest.

use std::sync::Arc;
use std::time::Duration;

use manimflow_core::callback_url::callback_url;
use manimflow_core::error::CoreError;
use manimflow_core::hashing::sha256_hex;
use manimflow_core::render_job::{
    validate_render_code, RenderQuality, RenderStatus, TerminalOutcome, DISPATCH_FAILURE_PREFIX,
    MISSING_VIDEO_MESSAGE, TIMEOUT_FAILURE_MESSAGE,
};
use manimflow_core::types::{DbId, JobId};
use manimflow_db::store::JobStore;
use manimflow_render::{ExecuteRequest, RenderBackend, StartRequest};
use serde::Serialize;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Whether renders are awaited in the request or completed by callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Sync,
    Async,
}

impl DispatchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Async => "async",
        }
    }
}

/// A validated render request from the job owner.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub job_id: JobId,
    pub owner_id: DbId,
    pub code: String,
    pub quality: RenderQuality,
    /// Public base URL the execution service calls back on.
    pub callback_base: String,
}

/// Result of a dispatch that did not fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    /// Synchronous render finished and `COMPLETED` was written.
    Completed {
        job_id: JobId,
        status: RenderStatus,
        video_ref: String,
        thumbnail_ref: Option<String>,
        duration_secs: Option<f64>,
    },
    /// Asynchronous render handed off; the callback writes the outcome.
    Accepted { job_id: JobId, status: RenderStatus },
}

/// Starts renders against the execution service.
pub struct RenderDispatcher {
    store: Arc<dyn JobStore>,
    backend: Arc<dyn RenderBackend>,
    mode: DispatchMode,
    render_timeout: Duration,
    tracker: TaskTracker,
}

impl RenderDispatcher {
    pub fn new(
        store: Arc<dyn JobStore>,
        backend: Arc<dyn RenderBackend>,
        mode: DispatchMode,
        render_timeout: Duration,
    ) -> Self {
        Self {
            store,
            backend,
            mode,
            render_timeout,
            tracker: TaskTracker::new(),
        }
    }

    pub fn mode(&self) -> DispatchMode {
        self.mode
    }

    /// Number of tracked render tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for all tracked render tasks to finish.
    ///
    /// The tracker is reopened afterwards so the dispatcher stays usable.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Validate, authorize and start a render.
    ///
    /// Nothing is written when validation or authorization fails. A job that
    /// is already rendering is re-dispatched: the new token replaces the old
    /// one, so the superseded render can no longer write an outcome.
    pub async fn dispatch(&self, request: DispatchRequest) -> AppResult<DispatchOutcome> {
        validate_render_code(&request.code)?;

        let job = self
            .store
            .find_by_id(request.job_id)
            .await?
            .ok_or_else(|| CoreError::job_not_found(request.job_id))?;

        if job.owner_id != request.owner_id {
            return Err(AppError::Core(CoreError::Forbidden(
                "Cannot render another user's animation".into(),
            )));
        }

        let token = Uuid::new_v4().to_string();
        let token_hash = sha256_hex(token.as_bytes());

        if self
            .store
            .begin_render(job.id, &request.code, &token_hash)
            .await?
            .is_none()
        {
            // Deleted between the lookup and the write.
            return Err(AppError::Core(CoreError::job_not_found(job.id)));
        }

        tracing::info!(
            job_id = %job.id,
            owner_id = request.owner_id,
            mode = self.mode.as_str(),
            quality = request.quality.as_str(),
            superseded = job.status == RenderStatus::Rendering,
            "Render dispatched",
        );

        match self.mode {
            DispatchMode::Sync => self.spawn_sync(request, token_hash).await,
            DispatchMode::Async => {
                self.spawn_start(request, &token, token_hash);
                Ok(DispatchOutcome::Accepted {
                    job_id: job.id,
                    status: RenderStatus::Rendering,
                })
            }
        }
    }

    /// Run the synchronous render in a tracked task and wait for it.
    ///
    /// The task owns the render and its terminal write, so dropping the
    /// request (client disconnect, HTTP timeout) cannot leave the job in
    /// `RENDERING`.
    async fn spawn_sync(
        &self,
        request: DispatchRequest,
        token_hash: String,
    ) -> AppResult<DispatchOutcome> {
        let job_id = request.job_id;
        let task = self.tracker.spawn(render_sync(
            Arc::clone(&self.store),
            Arc::clone(&self.backend),
            self.render_timeout,
            request,
            token_hash,
        ));
        task.await.map_err(|e| {
            tracing::error!(job_id = %job_id, error = %e, "Synchronous render task aborted");
            AppError::InternalError(format!("Render task failed: {e}"))
        })?
    }

    /// Hand the job to the execution service in a tracked background task.
    ///
    /// If the service never accepts the job no callback will arrive, so the
    /// task writes `FAILED` itself.
    fn spawn_start(&self, request: DispatchRequest, token: &str, token_hash: String) {
        let store = Arc::clone(&self.store);
        let backend = Arc::clone(&self.backend);
        let job_id = request.job_id;
        let start = StartRequest {
            code: request.code,
            quality: request.quality,
            job_id,
            callback_url: callback_url(&request.callback_base, token),
        };

        self.tracker.spawn(async move {
            if let Err(e) = backend.start(&start).await {
                let message = format!("{DISPATCH_FAILURE_PREFIX}: {}", e.failure_message());
                tracing::error!(job_id = %job_id, error = %e, "Render service did not accept job");
                let outcome = TerminalOutcome::failed(Some(message));
                if let Err(db_err) =
                    record_terminal(store.as_ref(), job_id, &token_hash, outcome).await
                {
                    tracing::error!(
                        job_id = %job_id,
                        error = %db_err,
                        "Failed to record dispatch failure",
                    );
                }
            }
        });
    }
}

/// Render through the execution service, bounded by `render_timeout`, and
/// write the terminal state. Dropping the timed-out call cancels it.
async fn render_sync(
    store: Arc<dyn JobStore>,
    backend: Arc<dyn RenderBackend>,
    render_timeout: Duration,
    request: DispatchRequest,
    token_hash: String,
) -> AppResult<DispatchOutcome> {
    let store = store.as_ref();
    let job_id = request.job_id;
    let execute = ExecuteRequest {
        code: request.code,
        quality: request.quality,
    };

    let result = match tokio::time::timeout(render_timeout, backend.execute(&execute)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            let message = e.failure_message();
            tracing::warn!(job_id = %job_id, error = %e, "Synchronous render failed");
            let outcome = TerminalOutcome::failed(Some(message.clone()));
            record_terminal(store, job_id, &token_hash, outcome).await?;
            return Err(AppError::RenderFailed(message));
        }
        Err(_) => {
            tracing::warn!(
                job_id = %job_id,
                timeout_secs = render_timeout.as_secs(),
                "Synchronous render timed out",
            );
            let outcome = TerminalOutcome::failed(Some(TIMEOUT_FAILURE_MESSAGE.to_string()));
            record_terminal(store, job_id, &token_hash, outcome).await?;
            return Err(AppError::RenderTimeout(TIMEOUT_FAILURE_MESSAGE.to_string()));
        }
    };

    let outcome = match TerminalOutcome::completed(
        result.video_ref,
        result.thumbnail_ref,
        result.duration_secs,
    ) {
        Ok(outcome) => outcome,
        Err(_) => {
            tracing::warn!(job_id = %job_id, "Render service reported success without a video");
            let outcome = TerminalOutcome::failed(Some(MISSING_VIDEO_MESSAGE.to_string()));
            record_terminal(store, job_id, &token_hash, outcome).await?;
            return Err(AppError::RenderFailed(MISSING_VIDEO_MESSAGE.to_string()));
        }
    };

    if !record_terminal(store, job_id, &token_hash, outcome.clone()).await? {
        return Err(AppError::Core(CoreError::Conflict(
            "Render outcome was superseded by another writer".into(),
        )));
    }

    tracing::info!(job_id = %job_id, "Synchronous render completed");
    match outcome {
        TerminalOutcome::Completed {
            video_ref,
            thumbnail_ref,
            duration_secs,
        } => Ok(DispatchOutcome::Completed {
            job_id,
            status: RenderStatus::Completed,
            video_ref,
            thumbnail_ref,
            duration_secs,
        }),
        TerminalOutcome::Failed { message } => Err(AppError::RenderFailed(message)),
    }
}

/// Conditional terminal write for one dispatch. Returns whether it applied.
async fn record_terminal(
    store: &dyn JobStore,
    job_id: JobId,
    token_hash: &str,
    outcome: TerminalOutcome,
) -> Result<bool, sqlx::Error> {
    let applied = store
        .record_outcome(job_id, Some(token_hash), &outcome)
        .await?;
    if applied {
        tracing::info!(job_id = %job_id, status = %outcome.status(), "Terminal state recorded");
    } else {
        tracing::warn!(
            job_id = %job_id,
            status = %outcome.status(),
            "Terminal write skipped, dispatch no longer current",
        );
    }
    Ok(applied)
}
