//! Upstream gateway ports consumed by the dispatch engine.
//!
//! Each remote call is atomic from the caller's point of view: the saga
//! reacts only to the final status and body, and all retrying happens
//! inside the implementations.

pub mod http;

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

/// Final status and body of one upstream call. Ephemeral; produced once
/// per remote call and never persisted.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status_code: u16,
    pub body: Value,
}

/// Successful login: the extracted session token plus the raw body.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub session_token: String,
    pub body: Value,
}

/// Transport-level gateway failure. HTTP error statuses are NOT errors
/// here; they come back as an [`UpstreamResponse`].
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("{0}")]
    Transport(String),
    #[error("login response contained no session token")]
    MissingSessionToken,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Per-call upstream base URL overrides, parsed from the tool arguments.
///
/// Threaded explicitly through the call chain and dropped when the call
/// ends, so an override can never leak into another request.
#[derive(Debug, Clone, Default)]
pub struct UpstreamOverrides {
    auth_base_url: Option<String>,
    apps_base_url: Option<String>,
}

impl UpstreamOverrides {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(auth_base_url: Option<&str>, apps_base_url: Option<&str>) -> Self {
        Self {
            auth_base_url: normalize_opt(auth_base_url),
            apps_base_url: normalize_opt(apps_base_url),
        }
    }

    pub fn auth_base_url(&self) -> Option<&str> {
        self.auth_base_url.as_deref()
    }

    pub fn apps_base_url(&self) -> Option<&str> {
        self.apps_base_url.as_deref()
    }
}

fn normalize_opt(url: Option<&str>) -> Option<String> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(normalize_base_url)
}

/// Strip a trailing slash and the legacy "/Smart2Go" segment; the REST
/// endpoints live under "/rest/..." on the bare host.
pub fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed.strip_suffix("/Smart2Go").unwrap_or(trimmed).to_string()
}

/// Authentication against the upstream backend.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    async fn login(
        &self,
        username: &str,
        password: &str,
        companyname: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<LoginResult, GatewayError>;
}

/// App management operations on the upstream backend.
#[async_trait]
pub trait AppsGateway: Send + Sync {
    async fn save_app(
        &self,
        spec: &Value,
        session_token: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError>;

    /// Upload an exported app package (multipart/form-data, part name `file`).
    async fn upload_import_file(
        &self,
        file: &Path,
        session_token: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError>;

    /// Check whether the uploaded identifier already exists upstream.
    async fn validate_app_identifier(
        &self,
        payload: &Value,
        session_token: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError>;

    /// Perform the import using the payload returned from the upload
    /// (plus any conflict-resolution fields).
    async fn import_app(
        &self,
        payload: &Value,
        session_token: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_trailing_slash_and_legacy_segment() {
        assert_eq!(
            normalize_base_url("http://localhost:7070/Smart2Go"),
            "http://localhost:7070"
        );
        assert_eq!(
            normalize_base_url("http://localhost:7070/Smart2Go/"),
            "http://localhost:7070"
        );
        assert_eq!(
            normalize_base_url("  https://apps.example.com  "),
            "https://apps.example.com"
        );
    }

    #[test]
    fn overrides_normalize_and_drop_blanks() {
        let overrides = UpstreamOverrides::new(Some("http://a.example/Smart2Go"), Some("   "));
        assert_eq!(overrides.auth_base_url(), Some("http://a.example"));
        assert_eq!(overrides.apps_base_url(), None);
    }
}
