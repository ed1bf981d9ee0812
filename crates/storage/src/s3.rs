//! S3-backed artifact cleanup.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use futures::future::join_all;

use crate::cleaner::{ArtifactCleaner, CleanupError, CleanupReport};

/// Deletes artifacts from a single S3 bucket.
pub struct S3ArtifactCleaner {
    client: Client,
    bucket: String,
}

impl S3ArtifactCleaner {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Build a client from the default AWS provider chain.
    pub async fn from_env(bucket: impl Into<String>) -> Self {
        let sdk_config = aws_config::load_from_env().await;
        Self::new(Client::new(&sdk_config), bucket)
    }

    async fn delete_one(&self, reference: &str) -> Result<(), CleanupError> {
        let key = object_key(reference)
            .ok_or_else(|| CleanupError::InvalidReference(reference.to_string()))?;

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|e| CleanupError::Delete {
                key: key.clone(),
                message: e.to_string(),
            })?;

        tracing::debug!(bucket = %self.bucket, key = %key, "Deleted artifact");
        Ok(())
    }
}

#[async_trait]
impl ArtifactCleaner for S3ArtifactCleaner {
    async fn cleanup(&self, refs: &[String]) -> CleanupReport {
        let results = join_all(refs.iter().map(|r| self.delete_one(r))).await;

        let mut report = CleanupReport::default();
        for result in results {
            match result {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(error = %e, "Artifact cleanup failed");
                }
            }
        }
        tracing::info!(
            bucket = %self.bucket,
            deleted = report.deleted,
            failed = report.failed,
            "Artifact cleanup finished",
        );
        report
    }
}

/// Object key for a stored artifact reference.
///
/// Full URLs contribute their path without the leading `/`; bare keys are
/// used as-is. Returns `None` when nothing is left.
pub fn object_key(reference: &str) -> Option<String> {
    let key = match reqwest::Url::parse(reference) {
        Ok(url) => url.path().trim_start_matches('/').to_string(),
        Err(_) => reference.trim().trim_start_matches('/').to_string(),
    };
    (!key.is_empty()).then_some(key)
}
