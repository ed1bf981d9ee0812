use std::time::Duration;

use crate::auth::jwt::JwtConfig;

/// Extra request budget on top of the render timeout in synchronous mode,
/// so the render bound fires before the HTTP layer gives up.
const SYNC_REQUEST_MARGIN_SECS: u64 = 30;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on draining background renders at shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration.
    pub jwt: JwtConfig,
    /// Execution service and callback settings.
    pub render: RenderConfig,
    /// `DATABASE_URL`. `None` selects the in-memory job store.
    pub database_url: Option<String>,
}

/// How renders are dispatched and where their callbacks land.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Base URL of the execution service.
    pub service_url: String,
    /// Wait for the render inside the request instead of using callbacks.
    pub sync: bool,
    /// Upper bound on a synchronous render, in seconds.
    pub timeout_secs: u64,
    /// Explicit public base URL for callbacks.
    pub public_base_url: Option<String>,
    /// Hostname assigned by the hosting platform.
    pub deployment_host: Option<String>,
    /// Shared secret expected in `x-webhook-secret` on callbacks.
    pub webhook_secret: Option<String>,
}

impl RenderConfig {
    /// Load render settings from environment variables with defaults.
    ///
    /// | Env Var              | Default                 |
    /// |----------------------|-------------------------|
    /// | `RENDER_SERVICE_URL` | `http://localhost:8000` |
    /// | `SYNC_RENDER`        | `false`                 |
    /// | `RENDER_TIMEOUT_SECS`| `600`                   |
    /// | `PUBLIC_BASE_URL`    | unset                   |
    /// | `DEPLOYMENT_HOST`    | unset                   |
    /// | `WEBHOOK_SECRET`     | unset                   |
    pub fn from_env() -> Self {
        let service_url = std::env::var("RENDER_SERVICE_URL")
            .unwrap_or_else(|_| "http://localhost:8000".into());

        let sync = std::env::var("SYNC_RENDER")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let timeout_secs: u64 = std::env::var("RENDER_TIMEOUT_SECS")
            .unwrap_or_else(|_| "600".into())
            .parse()
            .expect("RENDER_TIMEOUT_SECS must be a valid u64");

        Self {
            service_url,
            sync,
            timeout_secs,
            public_base_url: optional_env("PUBLIC_BASE_URL"),
            deployment_host: optional_env("DEPLOYMENT_HOST"),
            webhook_secret: optional_env("WEBHOOK_SECRET"),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `DATABASE_URL`         | unset (in-memory store)    |
    ///
    /// See [`JwtConfig::from_env`] and [`RenderConfig::from_env`] for the
    /// remaining variables.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt: JwtConfig::from_env(),
            render: RenderConfig::from_env(),
            database_url: optional_env("DATABASE_URL"),
        }
    }

    /// Request timeout applied by the HTTP layer.
    ///
    /// In synchronous mode a render request legitimately lasts up to the
    /// render timeout, so the HTTP bound is raised above it.
    pub fn effective_request_timeout(&self) -> Duration {
        let secs = if self.render.sync {
            self.request_timeout_secs
                .max(self.render.timeout_secs + SYNC_REQUEST_MARGIN_SECS)
        } else {
            self.request_timeout_secs
        };
        Duration::from_secs(secs)
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
