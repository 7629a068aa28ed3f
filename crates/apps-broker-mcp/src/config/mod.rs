//! Server configuration from environment variables.

use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:7070/Smart2Go";
pub const DEFAULT_IMPORT_APPS_DIR: &str = "storage/import-apps";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Base URL for the login endpoint.
    pub auth_base_url: String,
    /// Base URL for the apps and import/export endpoints.
    pub apps_base_url: String,
    /// Root of the import storage tree (one folder per app name).
    pub import_apps_dir: PathBuf,
    /// Caller identity preloaded with the default token at startup.
    pub default_client_id: Option<String>,
    /// Backstop credential used when a caller never logged in.
    pub default_session_token: Option<String>,
    /// Bearer token for the HTTP transport; doubles as the secondary
    /// session-token fallback.
    pub http_auth_token: Option<String>,
    /// Whether per-call authBaseUrl/appsBaseUrl arguments are honored.
    pub override_enabled: bool,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            auth_base_url: env_or("MCP_AUTH_BASE_URL", DEFAULT_BASE_URL),
            apps_base_url: env_or("MCP_APPS_BASE_URL", DEFAULT_BASE_URL),
            import_apps_dir: PathBuf::from(env_or("MCP_IMPORT_APPS_DIR", DEFAULT_IMPORT_APPS_DIR)),
            default_client_id: env_opt("MCP_DEFAULT_CLIENT_ID"),
            default_session_token: env_opt("MCP_DEFAULT_SESSION_TOKEN"),
            http_auth_token: env_opt("MCP_HTTP_AUTH_TOKEN"),
            override_enabled: env_or("MCP_UPSTREAM_OVERRIDE_ENABLED", "true") != "false",
        }
    }

    /// Log the effective configuration. Tokens are never printed.
    pub fn log_startup(&self) {
        tracing::info!(
            "Runtime config: auth_base_url={}, apps_base_url={}, import_apps_dir={}, \
             default_client_id={}, default_session_token={}, http_auth_token={}, \
             upstream_override_enabled={}",
            self.auth_base_url,
            self.apps_base_url,
            self.import_apps_dir.display(),
            self.default_client_id.as_deref().unwrap_or(""),
            if self.default_session_token.is_some() { "***" } else { "" },
            if self.http_auth_token.is_some() { "***" } else { "" },
            self.override_enabled,
        );
    }
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
