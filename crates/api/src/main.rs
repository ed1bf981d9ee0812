use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use manimflow_api::config::ServerConfig;
use manimflow_api::engine::dispatcher::{DispatchMode, RenderDispatcher};
use manimflow_api::router::build_app_router;
use manimflow_api::state::AppState;
use manimflow_codegen::{ChatCompletionsGenerator, CodeGenerator, CodegenConfig};
use manimflow_db::store::{JobStore, MemoryJobStore, PgJobStore};
use manimflow_render::RenderServiceApi;
use manimflow_storage::{ArtifactCleaner, DisabledCleaner, S3ArtifactCleaner, StorageConfig};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "manimflow_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        render_service = %config.render.service_url,
        sync_render = config.render.sync,
        "Loaded server configuration",
    );

    // --- Job store ---
    let store: Arc<dyn JobStore> = match config.database_url.as_deref() {
        Some(database_url) => {
            let pool = manimflow_db::create_pool(database_url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            manimflow_db::health_check(&pool)
                .await
                .expect("Database health check failed");

            manimflow_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");

            Arc::new(PgJobStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory job store (data is not persisted)");
            Arc::new(MemoryJobStore::new())
        }
    };

    // --- Collaborators ---
    let backend = Arc::new(RenderServiceApi::new(config.render.service_url.clone()));
    let mode = if config.render.sync {
        DispatchMode::Sync
    } else {
        DispatchMode::Async
    };
    let dispatcher = Arc::new(RenderDispatcher::new(
        Arc::clone(&store),
        backend,
        mode,
        config.render.timeout(),
    ));

    let codegen: Arc<dyn CodeGenerator> =
        Arc::new(ChatCompletionsGenerator::new(CodegenConfig::from_env()));

    let cleaner: Arc<dyn ArtifactCleaner> = match StorageConfig::from_env().bucket {
        Some(bucket) => {
            tracing::info!(%bucket, "Artifact cleanup enabled");
            Arc::new(S3ArtifactCleaner::from_env(bucket).await)
        }
        None => {
            tracing::info!("AWS_S3_BUCKET_NAME not set, artifact cleanup disabled");
            Arc::new(DisabledCleaner)
        }
    };

    // --- App state ---
    let state = AppState {
        store,
        config: Arc::new(config.clone()),
        dispatcher: Arc::clone(&dispatcher),
        codegen,
        cleaner,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    let pending = dispatcher.in_flight();
    tracing::info!(pending, "Server stopped accepting connections, draining render dispatches");

    let drain_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain_timeout, dispatcher.drain()).await.is_err() {
        tracing::warn!(
            pending = dispatcher.in_flight(),
            "Render dispatches still running at shutdown timeout",
        );
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
