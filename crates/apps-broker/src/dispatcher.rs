//! Action routing and session enforcement.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::error::{AppError, ErrorCode};
use crate::gateway::{AppsGateway, AuthGateway, UpstreamOverrides};
use crate::handlers;
use crate::request::{ActionRequest, Outcome};
use crate::session::SessionStore;

const DEFAULT_CLIENT_ID: &str = "default";

/// Routes an action name to its handler, enforcing session-token presence
/// for protected actions first. Safe under concurrent invocation; the only
/// shared mutable state is the injected [`SessionStore`].
pub struct RequestDispatcher {
    auth: Arc<dyn AuthGateway>,
    apps: Arc<dyn AppsGateway>,
    sessions: Arc<SessionStore>,
    import_apps_dir: PathBuf,
}

impl RequestDispatcher {
    pub fn new(
        auth: Arc<dyn AuthGateway>,
        apps: Arc<dyn AppsGateway>,
        sessions: Arc<SessionStore>,
        import_apps_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            auth,
            apps,
            sessions,
            import_apps_dir: import_apps_dir.into(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Execute one action. Every failure comes back as a typed
    /// [`Outcome::Failure`]; nothing escapes to the transport layer.
    pub async fn execute(
        &self,
        mut request: ActionRequest,
        client_id: Option<&str>,
        overrides: &UpstreamOverrides,
    ) -> Outcome {
        tracing::debug!(
            "Executing request: action={}, clientId={:?}",
            request.action,
            client_id
        );

        if requires_session(&request.action) {
            // An explicit sessionToken argument wins outright; otherwise
            // fall back to the stored/default token for this caller.
            if request.str_param("sessionToken").is_none() {
                let effective_client_id = client_id
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or(DEFAULT_CLIENT_ID);
                let Some(token) = self.sessions.get_token(effective_client_id) else {
                    return Outcome::failure(
                        request.id,
                        AppError::new(ErrorCode::Forbidden, "you must log in first"),
                    );
                };
                request
                    .parameters
                    .insert("sessionToken".to_string(), Value::String(token));
            }
        }

        match request.action.as_str() {
            "ping" => Outcome::success(request.id, json!({ "message": "pong" })),
            "login" => {
                handlers::login::handle(
                    self.auth.as_ref(),
                    &self.sessions,
                    &request,
                    client_id,
                    overrides,
                )
                .await
            }
            "create_app" => {
                handlers::create_app::handle(self.apps.as_ref(), &request, overrides).await
            }
            "import_app" => {
                handlers::import_app::handle(
                    self.apps.as_ref(),
                    &self.import_apps_dir,
                    &request,
                    overrides,
                )
                .await
            }
            _ => Outcome::failure(
                request.id,
                AppError::with_details(
                    ErrorCode::InvalidAction,
                    "Unknown action",
                    json!({ "action": request.action }),
                ),
            ),
        }
    }
}

fn requires_session(action: &str) -> bool {
    !matches!(action, "ping" | "login")
}
