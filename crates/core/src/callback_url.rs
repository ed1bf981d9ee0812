//! Resolution of the public address the execution service calls back on.
//!
//! The callback must be reachable from outside the deployment, so explicit
//! configuration wins over anything derived from the incoming request,
//! which may carry an internal proxy hostname.

/// Used when nothing else is known (local development).
pub const LOCAL_DEFAULT_BASE: &str = "http://localhost:3000";

/// Path of the callback endpoint under the base URL.
pub const CALLBACK_PATH: &str = "/api/v1/render/callback";

/// Candidate sources for the callback base URL.
#[derive(Debug, Default, Clone, Copy)]
pub struct CallbackBaseSources<'a> {
    /// Explicitly configured public base URL (`PUBLIC_BASE_URL`).
    pub public_base_url: Option<&'a str>,
    /// Hostname provided by the hosting platform (`DEPLOYMENT_HOST`).
    pub deployment_host: Option<&'a str>,
    /// `X-Forwarded-Host` or `Host` of the dispatching request.
    pub request_host: Option<&'a str>,
    /// `X-Forwarded-Proto` of the dispatching request.
    pub request_proto: Option<&'a str>,
}

/// Pick the base URL in priority order: configured public URL, platform
/// hostname (always https), request host, local default.
pub fn resolve_base(sources: &CallbackBaseSources<'_>) -> String {
    if let Some(base) = present(sources.public_base_url) {
        return base.trim_end_matches('/').to_string();
    }
    if let Some(host) = present(sources.deployment_host) {
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            return host.to_string();
        }
        return format!("https://{host}");
    }
    if let Some(host) = present(sources.request_host) {
        let proto = present(sources.request_proto).unwrap_or("http");
        return format!("{proto}://{}", host.trim_end_matches('/'));
    }
    LOCAL_DEFAULT_BASE.to_string()
}

/// Full callback URL carrying the per-dispatch token.
pub fn callback_url(base: &str, token: &str) -> String {
    format!("{base}{CALLBACK_PATH}?token={token}")
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_sources() -> CallbackBaseSources<'static> {
        CallbackBaseSources {
            public_base_url: Some("https://manimflow.example.com/"),
            deployment_host: Some("manimflow-abc.platform.app"),
            request_host: Some("internal:3000"),
            request_proto: Some("http"),
        }
    }

    #[test]
    fn configured_url_wins() {
        assert_eq!(resolve_base(&all_sources()), "https://manimflow.example.com");
    }

    #[test]
    fn deployment_host_is_next_and_forced_https() {
        let sources = CallbackBaseSources {
            public_base_url: Some("  "),
            ..all_sources()
        };
        assert_eq!(resolve_base(&sources), "https://manimflow-abc.platform.app");
    }

    #[test]
    fn request_host_before_default() {
        let sources = CallbackBaseSources {
            request_host: Some("app.local:8080"),
            request_proto: None,
            ..Default::default()
        };
        assert_eq!(resolve_base(&sources), "http://app.local:8080");
    }

    #[test]
    fn falls_back_to_localhost() {
        assert_eq!(resolve_base(&CallbackBaseSources::default()), LOCAL_DEFAULT_BASE);
    }

    #[test]
    fn callback_url_appends_path_and_token() {
        assert_eq!(
            callback_url("https://a.b", "tok"),
            "https://a.b/api/v1/render/callback?token=tok"
        );
    }
}
