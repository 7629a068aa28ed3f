//! Login: authenticate upstream and store the session token under a
//! stable caller identity.

use serde_json::json;

use crate::error::{AppError, ErrorCode};
use crate::gateway::{AuthGateway, UpstreamOverrides};
use crate::request::{ActionRequest, Outcome};
use crate::session::SessionStore;

pub(crate) async fn handle(
    auth: &dyn AuthGateway,
    sessions: &SessionStore,
    request: &ActionRequest,
    client_id: Option<&str>,
    overrides: &UpstreamOverrides,
) -> Outcome {
    let (Some(username), Some(password), Some(companyname)) = (
        request.str_param("username"),
        request.str_param("password"),
        request.str_param("companyname"),
    ) else {
        return Outcome::failure(
            request.id,
            AppError::new(
                ErrorCode::ValidationFailed,
                "Missing required fields: username, password, companyname",
            ),
        );
    };

    let result = match auth.login(username, password, companyname, overrides).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!("Login failed: {e}");
            return login_failure(request, &e.to_string());
        }
    };

    // Keyed by the caller-provided clientId when there is one; otherwise
    // a stable identity derived from the credentials.
    let stable_client_id = match client_id.filter(|c| !c.trim().is_empty()) {
        Some(id) => id.to_string(),
        None => format!("{companyname}::{username}"),
    };

    if let Err(e) = sessions.set_token(&stable_client_id, &result.session_token) {
        return login_failure(request, &e.to_string());
    }

    tracing::info!("Login successful: clientId={stable_client_id}");

    Outcome::success(
        request.id,
        json!({
            "sessionToken": result.session_token,
            "clientId": stable_client_id,
        }),
    )
}

fn login_failure(request: &ActionRequest, error: &str) -> Outcome {
    Outcome::failure(
        request.id,
        AppError::with_details(
            ErrorCode::Forbidden,
            format!("Login failed: {error}"),
            json!({ "error": error }),
        ),
    )
}
