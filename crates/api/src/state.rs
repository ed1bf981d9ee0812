use std::sync::Arc;

use manimflow_codegen::CodeGenerator;
use manimflow_db::store::JobStore;
use manimflow_storage::ArtifactCleaner;

use crate::config::ServerConfig;
use crate::engine::dispatcher::RenderDispatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; every collaborator sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Durable record of render jobs.
    pub store: Arc<dyn JobStore>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Starts renders and tracks background dispatches.
    pub dispatcher: Arc<RenderDispatcher>,
    /// Prompt-to-code generation.
    pub codegen: Arc<dyn CodeGenerator>,
    /// Artifact removal on account deletion.
    pub cleaner: Arc<dyn ArtifactCleaner>,
}
