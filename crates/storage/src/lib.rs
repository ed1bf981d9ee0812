//! Artifact cleanup collaborator.
//!
//! Deleting an account removes the owner's jobs first; the stored videos and
//! thumbnails are then handed to an [`ArtifactCleaner`]. Cleanup is
//! advisory: individual failures are logged and counted, never propagated.

pub mod cleaner;
pub mod config;
pub mod s3;

pub use cleaner::{ArtifactCleaner, CleanupError, CleanupReport, DisabledCleaner};
pub use config::StorageConfig;
pub use s3::{object_key, S3ArtifactCleaner};
