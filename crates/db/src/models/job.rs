//! Render job entity and DTOs.

use manimflow_core::render_errors;
use manimflow_core::render_job::{RenderStatus, TerminalOutcome};
use manimflow_core::status_view::{self, JobStatusView};
use manimflow_core::types::{DbId, JobId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `render_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RenderJob {
    pub id: JobId,
    pub owner_id: DbId,
    pub prompt: String,
    pub code: String,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: RenderStatus,
    pub video_ref: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub duration_secs: Option<f64>,
    pub error_message: Option<String>,
    pub model: String,
    pub provider_tag: String,
    /// Digest of the current dispatch's callback token.
    #[serde(skip_serializing)]
    pub dispatch_token_hash: Option<String>,
    pub created_at: Timestamp,
    pub render_started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub updated_at: Timestamp,
}

impl RenderJob {
    /// Build the client-facing status snapshot as of `now`.
    pub fn status_view(&self, now: Timestamp) -> JobStatusView {
        let elapsed = status_view::elapsed_seconds(self.created_at, now);
        JobStatusView {
            job_id: self.id,
            status: self.status,
            video_ref: self.video_ref.clone(),
            thumbnail_ref: self.thumbnail_ref.clone(),
            duration_secs: self.duration_secs,
            error_message: self.error_message.clone(),
            elapsed_seconds: elapsed,
            estimated_remaining_seconds: status_view::estimated_remaining_seconds(
                self.status,
                elapsed,
            ),
            is_complete: self.status.is_terminal(),
            error_hint: self.error_message.as_deref().map(render_errors::classify),
        }
    }

    /// Stored artifact references (video first), skipping nulls.
    pub fn artifact_refs(&self) -> impl Iterator<Item = &str> {
        self.video_ref
            .as_deref()
            .into_iter()
            .chain(self.thumbnail_ref.as_deref())
    }

    /// Apply a terminal outcome to this in-memory copy, clearing the fields
    /// that belong to the other outcome.
    pub(crate) fn apply_outcome(&mut self, outcome: &TerminalOutcome, now: Timestamp) {
        self.status = outcome.status();
        self.video_ref = outcome.video_ref().map(str::to_string);
        self.thumbnail_ref = outcome.thumbnail_ref().map(str::to_string);
        self.duration_secs = outcome.duration_secs();
        self.error_message = outcome.error_message().map(str::to_string);
        self.completed_at = Some(now);
        self.updated_at = now;
    }
}

/// DTO for creating a job once code generation succeeds.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRenderJob {
    pub owner_id: DbId,
    pub prompt: String,
    pub code: String,
    pub model: String,
    pub provider_tag: String,
}

/// Query parameters for `GET /api/v1/animations`.
#[derive(Debug, Default, Deserialize)]
pub struct JobListQuery {
    /// Maximum number of results. Defaults to 50, capped at 100.
    pub limit: Option<i64>,
    /// Number of results to skip. Defaults to 0.
    pub offset: Option<i64>,
}

/// Maximum page size for job listing.
pub const MAX_LIMIT: i64 = 100;

/// Default page size for job listing.
pub const DEFAULT_LIMIT: i64 = 50;

impl JobListQuery {
    /// Effective `(limit, offset)` after defaults and clamping.
    pub fn page(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use super::*;

    fn job(status: RenderStatus) -> RenderJob {
        let now = Utc::now();
        RenderJob {
            id: Uuid::new_v4(),
            owner_id: 1,
            prompt: "a circle morphing into a square".into(),
            code: "from manim import *".into(),
            status,
            video_ref: None,
            thumbnail_ref: None,
            duration_secs: None,
            error_message: None,
            model: "llama-3.3-70b-versatile".into(),
            provider_tag: "groq".into(),
            dispatch_token_hash: None,
            created_at: now - Duration::seconds(20),
            render_started_at: None,
            completed_at: None,
            updated_at: now,
        }
    }

    #[test]
    fn rendering_view_has_estimate() {
        let j = job(RenderStatus::Rendering);
        let view = j.status_view(j.created_at + Duration::seconds(20));
        assert_eq!(view.elapsed_seconds, 20);
        assert_eq!(view.estimated_remaining_seconds, 40);
        assert!(!view.is_complete);
        assert!(view.error_hint.is_none());
    }

    #[test]
    fn failed_view_carries_hint() {
        let mut j = job(RenderStatus::Rendering);
        j.apply_outcome(
            &TerminalOutcome::failed(Some("SyntaxError: invalid syntax".into())),
            Utc::now(),
        );
        let view = j.status_view(Utc::now());
        assert!(view.is_complete);
        assert_eq!(view.estimated_remaining_seconds, 0);
        assert_eq!(
            view.error_hint.map(|h| h.category),
            Some(render_errors::ErrorCategory::SyntaxError)
        );
        // The stored message is untouched by classification.
        assert_eq!(j.error_message.as_deref(), Some("SyntaxError: invalid syntax"));
    }

    #[test]
    fn outcome_clears_opposite_fields() {
        let mut j = job(RenderStatus::Rendering);
        j.error_message = Some("stale".into());
        let outcome =
            TerminalOutcome::completed(Some("v1".into()), Some("t1".into()), Some(3.5)).unwrap();
        j.apply_outcome(&outcome, Utc::now());
        assert_eq!(j.status, RenderStatus::Completed);
        assert_eq!(j.error_message, None);
        assert_eq!(j.artifact_refs().collect::<Vec<_>>(), vec!["v1", "t1"]);
    }

    #[test]
    fn page_is_clamped() {
        assert_eq!(JobListQuery::default().page(), (DEFAULT_LIMIT, 0));
        let q = JobListQuery {
            limit: Some(1000),
            offset: Some(-3),
        };
        assert_eq!(q.page(), (MAX_LIMIT, 0));
    }
}
