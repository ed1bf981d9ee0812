use async_trait::async_trait;

/// Failure to delete one artifact.
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    #[error("Cannot derive an object key from '{0}'")]
    InvalidReference(String),

    #[error("Failed to delete object '{key}': {message}")]
    Delete { key: String, message: String },
}

/// Outcome of a cleanup pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub failed: usize,
}

/// Best-effort removal of stored artifacts.
#[async_trait]
pub trait ArtifactCleaner: Send + Sync {
    /// Delete every referenced artifact. Never fails as a whole.
    async fn cleanup(&self, refs: &[String]) -> CleanupReport;
}

/// Cleaner used when no bucket is configured.
#[derive(Debug, Default)]
pub struct DisabledCleaner;

#[async_trait]
impl ArtifactCleaner for DisabledCleaner {
    async fn cleanup(&self, refs: &[String]) -> CleanupReport {
        if !refs.is_empty() {
            tracing::info!(count = refs.len(), "Artifact storage not configured, skipping cleanup");
        }
        CleanupReport::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_cleaner_deletes_nothing() {
        let report = DisabledCleaner.cleanup(&["https://b/v1.mp4".into()]).await;
        assert_eq!(report, CleanupReport::default());
    }
}
