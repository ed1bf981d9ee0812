//! Render job status machine and terminal outcomes.
//!
//! ```text
//! GENERATING ──> RENDERING ──> COMPLETED
//!                    │   ^         │
//!                    v   └─────────┤  (owner re-dispatch)
//!                  FAILED ─────────┘
//! ```
//!
//! `COMPLETED` and `FAILED` are terminal for every automated writer. The
//! only edge leaving them is an explicit re-dispatch by the owner, which
//! re-enters `RENDERING`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Stored when a failure callback carries no message of its own.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Video rendering failed";

/// Stored when a synchronous render exceeds its time bound.
pub const TIMEOUT_FAILURE_MESSAGE: &str =
    "Video generation timed out. Please try with a simpler animation.";

/// Prefix for failures of the asynchronous start call itself. No callback
/// will ever arrive for such a job.
pub const DISPATCH_FAILURE_PREFIX: &str = "Failed to start rendering job";

/// Stored when the execution service reports success without a video.
pub const MISSING_VIDEO_MESSAGE: &str = "Render service returned no video reference";

/// Minimum prompt length accepted by code generation (after trimming).
pub const MIN_PROMPT_LENGTH: usize = 10;

// ---------------------------------------------------------------------------
// RenderStatus
// ---------------------------------------------------------------------------

/// Status ID type matching the `render_statuses` SMALLINT lookup table.
pub type StatusId = i16;

/// Lifecycle status of a render job.
///
/// Discriminants match the seed order of the `render_statuses` table.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RenderStatus {
    Generating = 1,
    Rendering = 2,
    Completed = 3,
    Failed = 4,
}

/// A status id with no matching [`RenderStatus`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown render status id {0}")]
pub struct UnknownStatus(pub StatusId);

impl RenderStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Wire and log representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generating => "GENERATING",
            Self::Rendering => "RENDERING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the status machine.
    ///
    /// Any state except `GENERATING` may re-enter `RENDERING` when the owner
    /// re-dispatches. `RENDERING -> RENDERING` replaces the dispatch token,
    /// which retires the superseded render's outcome.
    pub fn can_transition_to(self, next: RenderStatus) -> bool {
        use RenderStatus::*;
        matches!(
            (self, next),
            (Generating, Rendering)
                | (Rendering, Rendering)
                | (Rendering, Completed)
                | (Rendering, Failed)
                | (Completed, Rendering)
                | (Failed, Rendering)
        )
    }
}

impl TryFrom<StatusId> for RenderStatus {
    type Error = UnknownStatus;

    fn try_from(value: StatusId) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Generating),
            2 => Ok(Self::Rendering),
            3 => Ok(Self::Completed),
            4 => Ok(Self::Failed),
            other => Err(UnknownStatus(other)),
        }
    }
}

impl From<RenderStatus> for StatusId {
    fn from(value: RenderStatus) -> Self {
        value as StatusId
    }
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RenderQuality
// ---------------------------------------------------------------------------

/// Output quality tier requested from the execution service.
///
/// The service expects the single-letter Manim quality flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RenderQuality {
    #[default]
    #[serde(rename = "l", alias = "low")]
    Low,
    #[serde(rename = "m", alias = "medium")]
    Medium,
    #[serde(rename = "h", alias = "high")]
    High,
}

impl RenderQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "l",
            Self::Medium => "m",
            Self::High => "h",
        }
    }
}

// ---------------------------------------------------------------------------
// TerminalOutcome
// ---------------------------------------------------------------------------

/// The single terminal write a dispatch ends with.
///
/// A completed outcome always carries a video reference and a failed one
/// always carries a message, so a stored terminal job satisfies exactly
/// one of `video_ref.is_some()` / `error_message.is_some()`.
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalOutcome {
    Completed {
        video_ref: String,
        thumbnail_ref: Option<String>,
        duration_secs: Option<f64>,
    },
    Failed {
        message: String,
    },
}

impl TerminalOutcome {
    /// Build a completed outcome, rejecting a blank video reference.
    pub fn completed(
        video_ref: Option<String>,
        thumbnail_ref: Option<String>,
        duration_secs: Option<f64>,
    ) -> Result<Self, CoreError> {
        let video_ref = non_blank(video_ref).ok_or_else(|| {
            CoreError::Validation("video reference is required for a completed render".into())
        })?;
        Ok(Self::Completed {
            video_ref,
            thumbnail_ref: non_blank(thumbnail_ref),
            duration_secs,
        })
    }

    /// Build a failed outcome, substituting [`DEFAULT_FAILURE_MESSAGE`] for
    /// a missing or blank message.
    pub fn failed(message: Option<String>) -> Self {
        Self::Failed {
            message: non_blank(message).unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
        }
    }

    pub fn status(&self) -> RenderStatus {
        match self {
            Self::Completed { .. } => RenderStatus::Completed,
            Self::Failed { .. } => RenderStatus::Failed,
        }
    }

    pub fn video_ref(&self) -> Option<&str> {
        match self {
            Self::Completed { video_ref, .. } => Some(video_ref),
            Self::Failed { .. } => None,
        }
    }

    pub fn thumbnail_ref(&self) -> Option<&str> {
        match self {
            Self::Completed { thumbnail_ref, .. } => thumbnail_ref.as_deref(),
            Self::Failed { .. } => None,
        }
    }

    pub fn duration_secs(&self) -> Option<f64> {
        match self {
            Self::Completed { duration_secs, .. } => *duration_secs,
            Self::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { message } => Some(message),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject empty render code before anything is written.
pub fn validate_render_code(code: &str) -> Result<(), CoreError> {
    if code.trim().is_empty() {
        return Err(CoreError::Validation("code must not be empty".into()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
