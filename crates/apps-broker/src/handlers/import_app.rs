//! import_app: the upload → validate → import saga.
//!
//! Sequential and short-circuiting: validate only runs after a successful
//! upload, import only after a successful validate. There is no
//! compensating action — if importApp fails after a successful upload, the
//! uploaded artifact stays upstream and the failure surfaces the partial
//! state instead of retrying the whole saga.

use std::path::Path;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::{AppError, ErrorCode};
use crate::files;
use crate::gateway::{AppsGateway, GatewayError, UpstreamOverrides, UpstreamResponse};
use crate::identifier;
use crate::request::{ActionRequest, Outcome};

pub(crate) async fn handle(
    apps: &dyn AppsGateway,
    import_apps_dir: &Path,
    request: &ActionRequest,
    overrides: &UpstreamOverrides,
) -> Outcome {
    let Some(app_name) = request.str_param("appName") else {
        return Outcome::failure(
            request.id,
            AppError::new(ErrorCode::ValidationFailed, "appName is required"),
        );
    };
    let Some(session_token) = request.str_param("sessionToken") else {
        return Outcome::failure(
            request.id,
            AppError::new(ErrorCode::ValidationFailed, "Missing sessionToken"),
        );
    };

    let selected_file = match files::resolve_newest_file(import_apps_dir, app_name.trim()) {
        Ok(file) => file,
        Err(e) => {
            return Outcome::failure(
                request.id,
                AppError::with_details(
                    ErrorCode::NotFound,
                    e.to_string(),
                    json!({
                        "importAppsDir": import_apps_dir.display().to_string(),
                        "appName": app_name,
                    }),
                ),
            );
        }
    };

    let saga = Saga {
        apps,
        session_token,
        requested_new_identifier: request.str_param("newAppIdentifier"),
        requested_new_name: request.str_param("newAppName"),
        debug: request.bool_param("debug"),
        overrides,
    };

    match saga.run(request.id, &selected_file).await {
        Ok(outcome) => outcome,
        // Transport-level gateway failures are the only errors left here.
        Err(e) => {
            tracing::error!("Failed to import app: {e}");
            Outcome::failure(
                request.id,
                AppError::new(ErrorCode::InternalError, e.to_string()),
            )
        }
    }
}

struct Saga<'a> {
    apps: &'a dyn AppsGateway,
    session_token: &'a str,
    requested_new_identifier: Option<&'a str>,
    requested_new_name: Option<&'a str>,
    debug: bool,
    overrides: &'a UpstreamOverrides,
}

impl Saga<'_> {
    async fn run(&self, request_id: Uuid, selected_file: &Path) -> Result<Outcome, GatewayError> {
        let upload = self
            .apps
            .upload_import_file(selected_file, self.session_token, self.overrides)
            .await?;
        if upload.status_code != 200 {
            return Ok(upstream_failure(request_id, "uploadFile failed", &upload));
        }

        // uuid / identifiers for the rest of the saga come from the upload
        // response, not from the caller.
        let upload_body = as_object(&upload.body);
        let uploaded_app_name = string_field(&upload_body, "appName");
        let uploaded_app_identifier = string_field(&upload_body, "appIdentifier");
        let uploaded_app_uuid = string_field(&upload_body, "appUuid");

        let missing: Vec<&str> = [
            ("appName", &uploaded_app_name),
            ("appIdentifier", &uploaded_app_identifier),
            ("appUuid", &uploaded_app_uuid),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| key)
        .collect();

        if !missing.is_empty() {
            return Ok(Outcome::failure(
                request_id,
                AppError::with_details(
                    ErrorCode::UpstreamError,
                    "uploadFile response missing required fields",
                    json!({
                        "missing": missing,
                        "uploadBody": upload_body,
                    }),
                ),
            ));
        }
        // The emptiness check above guarantees all three.
        let uploaded_app_name = uploaded_app_name.unwrap_or_default();
        let uploaded_app_identifier = uploaded_app_identifier.unwrap_or_default();
        let uploaded_app_uuid = uploaded_app_uuid.unwrap_or_default();

        let validate_payload = json!({
            "appName": &uploaded_app_name,
            "appIdentifier": &uploaded_app_identifier,
            "appUuid": &uploaded_app_uuid,
        });
        let validate = self
            .apps
            .validate_app_identifier(&validate_payload, self.session_token, self.overrides)
            .await?;
        if validate.status_code != 200 {
            return Ok(upstream_failure(
                request_id,
                "validateAppIdentifier failed",
                &validate,
            ));
        }

        let validate_body = as_object(&validate.body);
        let exists = string_field(&validate_body, "existAppName").is_some()
            || validate_body.get("allowMerge").and_then(Value::as_bool) == Some(true);

        // Full copy of the upload body, preserving every nested field the
        // backend expects to get back.
        let mut import_payload = upload_body.clone();

        let conflict_resolution = json!({
            "exists": exists,
            "requestedNewAppIdentifier": self.requested_new_identifier.unwrap_or(""),
            "requestedNewAppName": self.requested_new_name.unwrap_or(""),
        });

        let mut imported_as = None;
        if exists {
            let new_app_name = match self.requested_new_name {
                Some(name) => name.trim().to_string(),
                None => format!("{uploaded_app_name} (Imported)"),
            };
            let new_app_identifier = match self.requested_new_identifier {
                Some(id) => id.trim().to_uppercase(),
                None => identifier::random_identifier(),
            };

            import_payload.insert("replaceAppIdentifier".to_string(), Value::Bool(true));
            import_payload.insert(
                "newAppIdentifier".to_string(),
                Value::String(new_app_identifier.clone()),
            );
            import_payload.insert("newAppName".to_string(), Value::String(new_app_name.clone()));

            imported_as = Some(json!({
                "newAppName": new_app_name,
                "newAppIdentifier": new_app_identifier,
            }));
        }

        let import_payload = Value::Object(import_payload);
        let import = self
            .apps
            .import_app(&import_payload, self.session_token, self.overrides)
            .await?;
        if import.status_code != 200 {
            return Ok(upstream_failure(request_id, "importApp failed", &import));
        }

        // Condensed summaries by default; the raw upstream payloads can be
        // large (integrationRepositories and friends) and only show up
        // under the debug flag.
        let upload_summary = json!({
            "appName": upload_body.get("appName"),
            "appIdentifier": upload_body.get("appIdentifier"),
            "appUuid": upload_body.get("appUuid"),
            "version": upload_body.get("version"),
        });
        let validate_summary = json!({
            "isValid": validate_body.get("isValid"),
            "existAppName": validate_body.get("existAppName"),
            "allowMerge": validate_body.get("allowMerge"),
        });
        let import_body = as_object(&import.body);
        let import_summary = if import_body.is_empty() {
            json!({ "body": &import.body })
        } else {
            json!({ "returnValue": import_body.get("returnValue") })
        };

        let mut result = Map::new();
        result.insert(
            "message".to_string(),
            Value::String(
                if exists {
                    "imported_with_conflict_resolution"
                } else {
                    "imported"
                }
                .to_string(),
            ),
        );
        result.insert(
            "selectedFile".to_string(),
            Value::String(selected_file.display().to_string()),
        );
        result.insert("uploaded".to_string(), upload_summary);
        result.insert("validate".to_string(), validate_summary);
        result.insert("import".to_string(), import_summary);
        result.insert("conflictResolution".to_string(), conflict_resolution);
        if let Some(imported_as) = imported_as {
            result.insert("importedAs".to_string(), imported_as);
        }
        if self.debug {
            result.insert(
                "debugUpstream".to_string(),
                json!({
                    "uploadFile": { "status_code": upload.status_code, "body": upload_body },
                    "validateAppIdentifier": { "status_code": validate.status_code, "body": validate_body },
                    "importApp": { "status_code": import.status_code, "body": import.body },
                }),
            );
        }

        Ok(Outcome::success(request_id, Value::Object(result)))
    }
}

fn as_object(body: &Value) -> Map<String, Value> {
    body.as_object().cloned().unwrap_or_default()
}

/// Non-blank string field, trimmed.
fn string_field(body: &Map<String, Value>, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn upstream_failure(request_id: Uuid, message: &str, response: &UpstreamResponse) -> Outcome {
    Outcome::failure(
        request_id,
        AppError::with_details(
            ErrorCode::UpstreamError,
            message,
            json!({
                "status_code": response.status_code,
                "body": response.body,
            }),
        ),
    )
}
