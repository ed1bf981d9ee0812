/// Artifact storage configuration loaded from environment variables.
#[derive(Debug, Clone, Default)]
pub struct StorageConfig {
    /// `AWS_S3_BUCKET_NAME`. `None` disables cleanup.
    pub bucket: Option<String>,
}

impl StorageConfig {
    /// Load configuration from environment variables.
    ///
    /// Credentials and region come from the standard AWS provider chain.
    pub fn from_env() -> Self {
        Self {
            bucket: std::env::var("AWS_S3_BUCKET_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty()),
        }
    }
}
