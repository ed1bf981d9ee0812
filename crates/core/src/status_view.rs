//! Client-facing status snapshot of a render job.
//!
//! The view is what the status endpoint returns and what the client poller
//! consumes. Time estimates are a UX heuristic, not a guarantee.

use serde::{Deserialize, Serialize};

use crate::render_errors::ErrorHint;
use crate::render_job::RenderStatus;
use crate::types::{JobId, Timestamp};

/// Expected render duration used for the remaining-time estimate.
pub const FIXED_ESTIMATE_SECS: i64 = 60;

/// Current persisted fields of a job plus derived progress values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: RenderStatus,
    pub video_ref: Option<String>,
    pub thumbnail_ref: Option<String>,
    pub duration_secs: Option<f64>,
    pub error_message: Option<String>,
    pub elapsed_seconds: i64,
    pub estimated_remaining_seconds: i64,
    pub is_complete: bool,
    /// Friendlier rendering of `error_message` for display. Never stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_hint: Option<ErrorHint>,
}

/// Whole seconds since `created_at`, clamped at zero for clock skew.
pub fn elapsed_seconds(created_at: Timestamp, now: Timestamp) -> i64 {
    (now - created_at).num_seconds().max(0)
}

/// `max(0, FIXED_ESTIMATE_SECS - elapsed)` while in flight, zero once the
/// job is terminal.
pub fn estimated_remaining_seconds(status: RenderStatus, elapsed: i64) -> i64 {
    if status.is_terminal() {
        0
    } else {
        (FIXED_ESTIMATE_SECS - elapsed).max(0)
    }
}
