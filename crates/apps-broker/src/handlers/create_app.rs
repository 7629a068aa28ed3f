//! create_app: build a full app spec from partial caller input and save it
//! upstream.

use serde_json::{json, Value};

use crate::error::{AppError, ErrorCode};
use crate::gateway::{AppsGateway, UpstreamOverrides};
use crate::identifier;
use crate::request::{ActionRequest, Outcome};

const DEFAULT_ICON: &str = "fa fa-heart";

pub(crate) async fn handle(
    apps: &dyn AppsGateway,
    request: &ActionRequest,
    overrides: &UpstreamOverrides,
) -> Outcome {
    let Some(app_name) = request.str_param("appName") else {
        return Outcome::failure(
            request.id,
            AppError::new(ErrorCode::ValidationFailed, "appName is required"),
        );
    };
    let app_name = app_name.trim();

    // Anything but an explicit boolean counts as true.
    let appear_on_mobile = request
        .parameters
        .get("AppearOnMobile")
        .and_then(Value::as_bool)
        .unwrap_or(true);
    let app_identifier = match request.str_param("appIdentifier") {
        Some(id) => id.trim().to_string(),
        None => identifier::derive_identifier(app_name),
    };
    let short_notes = request.str_param("shortNotes").unwrap_or(app_name);
    let icon = request.str_param("icon").unwrap_or(DEFAULT_ICON);

    let spec = json!({
        "AppearOnMobile": appear_on_mobile,
        "appName": app_name,
        "appIdentifier": app_identifier,
        "shortNotes": short_notes,
        "icon": icon,
    });

    let Some(session_token) = request.str_param("sessionToken") else {
        return Outcome::failure(
            request.id,
            AppError::new(ErrorCode::ValidationFailed, "Missing sessionToken"),
        );
    };

    let response = match apps.save_app(&spec, session_token, overrides).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to create app: {e}");
            return Outcome::failure(
                request.id,
                AppError::new(ErrorCode::InternalError, e.to_string()),
            );
        }
    };

    if response.status_code != 200 {
        let message = if response.status_code == 401 || response.status_code == 403 {
            "Apps service rejected the sessionToken (unauthorized). Provide a valid \
             Smart2Go UserSessionToken (set MCP_DEFAULT_SESSION_TOKEN or pass sessionToken)."
        } else {
            "Apps service returned non-success status"
        };
        return Outcome::failure(
            request.id,
            AppError::with_details(
                ErrorCode::ValidationFailed,
                message,
                json!({
                    "status_code": response.status_code,
                    "body": response.body,
                }),
            ),
        );
    }

    tracing::info!("App created: appName={app_name}, appIdentifier={app_identifier}");

    Outcome::success(
        request.id,
        json!({
            "app": spec,
            "appsService": {
                "status_code": response.status_code,
                "body": response.body,
            },
        }),
    )
}
