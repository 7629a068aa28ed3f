//! In-memory session token store with a configured default-token fallback.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("clientId cannot be blank")]
    BlankClientId,
}

/// Maps caller identity to its current session token. Shared across
/// concurrent requests; lifetime is bounded to process uptime.
///
/// When no explicit entry exists for a caller, a configured default token
/// (primary default first, then the secondary fallback source) is returned
/// and cached under that clientId so repeat calls stay consistent.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, String>>,
    default_token: Option<String>,
    fallback_token: Option<String>,
}

impl SessionStore {
    pub fn new(default_token: Option<String>, fallback_token: Option<String>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            default_token: default_token.filter(|t| !t.trim().is_empty()),
            fallback_token: fallback_token.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Seed the configured default client with the configured token, when
    /// both exist. Called once at startup.
    pub fn preload(&self, default_client_id: Option<&str>) {
        let Some(token) = self.configured_token().map(str::to_string) else {
            return;
        };
        match default_client_id.filter(|c| !c.trim().is_empty()) {
            Some(client_id) => {
                self.lock().insert(client_id.to_string(), token);
                tracing::info!("Preloaded default session token for clientId={client_id}");
            }
            None => {
                tracing::info!(
                    "Default session token configured without a default clientId; \
                     it will be used as a fallback when needed"
                );
            }
        }
    }

    pub fn set_token(&self, client_id: &str, token: &str) -> Result<(), SessionStoreError> {
        if client_id.trim().is_empty() {
            return Err(SessionStoreError::BlankClientId);
        }
        self.lock().insert(client_id.to_string(), token.to_string());
        tracing::debug!("Session stored for clientId={client_id}");
        Ok(())
    }

    /// Stored token for the caller, or the configured default. Returns
    /// `None` for a blank clientId or when neither exists.
    pub fn get_token(&self, client_id: &str) -> Option<String> {
        if client_id.trim().is_empty() {
            return None;
        }

        let mut sessions = self.lock();
        if let Some(token) = sessions.get(client_id) {
            if !token.trim().is_empty() {
                tracing::debug!("Session retrieved for clientId={client_id}: found");
                return Some(token.clone());
            }
        }

        let fallback = self.configured_token()?.to_string();
        // Cache under this clientId so subsequent calls are consistent.
        sessions.insert(client_id.to_string(), fallback.clone());
        tracing::info!(
            "No stored session for clientId={client_id}; using configured default token fallback"
        );
        Some(fallback)
    }

    pub fn clear_token(&self, client_id: &str) {
        if client_id.trim().is_empty() {
            return;
        }
        self.lock().remove(client_id);
        tracing::debug!("Session cleared for clientId={client_id}");
    }

    fn configured_token(&self) -> Option<&str> {
        self.default_token
            .as_deref()
            .or(self.fallback_token.as_deref())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
        // A poisoned lock only means another thread panicked mid-insert;
        // the map itself stays usable.
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
