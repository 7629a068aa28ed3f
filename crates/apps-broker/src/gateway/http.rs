//! reqwest-backed implementations of the upstream gateway ports.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde_json::{json, Value};

use super::{
    normalize_base_url, AppsGateway, AuthGateway, GatewayError, LoginResult, UpstreamOverrides,
    UpstreamResponse,
};

const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);
const SAVE_APP_TIMEOUT: Duration = Duration::from_secs(10);
const VALIDATE_TIMEOUT: Duration = Duration::from_secs(15);
const IMPORT_TIMEOUT: Duration = Duration::from_secs(60);
/// Exported packages can be large; uploads get minutes, not seconds.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(600);

/// Extra attempts after the first, backing off from this delay.
const RETRY_ATTEMPTS: u32 = 2;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Fixed clock-skew offset sent on importApp (2 hours, in milliseconds).
const TIME_OFFSET_MS: u64 = 7_200_000;

const IMPORT_FILE_EXTENSION: &str = ".ntgapps";

/// HTTP implementation of [`AuthGateway`].
pub struct HttpAuthGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAuthGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
        }
    }
}

#[async_trait]
impl AuthGateway for HttpAuthGateway {
    async fn login(
        &self,
        username: &str,
        password: &str,
        companyname: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<LoginResult, GatewayError> {
        let base_url = overrides.auth_base_url().unwrap_or(&self.base_url);
        // "MainFunciton" is how the backend spells it.
        let url = format!("{base_url}/rest/MainFunciton/login");
        let payload = json!({
            "LoginUserInfo": {
                "loginUserName": username,
                "companyName": companyname,
            },
            "Password": password,
        });

        tracing::info!("Calling login API: {url}");

        let response = send_with_retry("login", || {
            self.client
                .post(&url)
                .header("SessionToken", "NTG")
                .json(&payload)
                .timeout(LOGIN_TIMEOUT)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Transport(format!(
                "login failed with status {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Transport(format!("login: invalid response body: {e}")))?;

        let session_token =
            extract_session_token(&body).ok_or(GatewayError::MissingSessionToken)?;

        tracing::info!("Login API response received");

        Ok(LoginResult {
            session_token,
            body,
        })
    }
}

/// Token field names the backend has used across versions, in preference
/// order.
const TOKEN_KEYS: [&str; 5] = [
    "UserSessionToken",
    "userSessionToken",
    "sessionToken",
    "SessionToken",
    "token",
];

fn extract_session_token(body: &Value) -> Option<String> {
    TOKEN_KEYS.iter().find_map(|key| {
        body.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}

/// HTTP implementation of [`AppsGateway`].
pub struct HttpAppsGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAppsGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: normalize_base_url(base_url),
        }
    }

    fn effective_base_url<'a>(&'a self, overrides: &'a UpstreamOverrides) -> &'a str {
        overrides.apps_base_url().unwrap_or(&self.base_url)
    }

    async fn post_json(
        &self,
        context: &'static str,
        url: String,
        payload: &Value,
        session_token: &str,
        timeout: Duration,
        with_time_offset: bool,
    ) -> Result<UpstreamResponse, GatewayError> {
        tracing::info!("Calling {context} API: {url}");

        let response = send_with_retry(context, || {
            let mut request = apply_session_headers(self.client.post(&url), session_token)
                .json(payload)
                .timeout(timeout);
            if with_time_offset {
                request = request.header("TimeOffset", TIME_OFFSET_MS.to_string());
            }
            request
        })
        .await?;

        read_response(context, response).await
    }
}

#[async_trait]
impl AppsGateway for HttpAppsGateway {
    async fn save_app(
        &self,
        spec: &Value,
        session_token: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        let url = format!("{}/rest/Apps/saveApp", self.effective_base_url(overrides));
        self.post_json("saveApp", url, spec, session_token, SAVE_APP_TIMEOUT, false)
            .await
    }

    async fn upload_import_file(
        &self,
        file: &Path,
        session_token: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        let url = format!(
            "{}/rest/importExport/uploadFile",
            self.effective_base_url(overrides)
        );
        tracing::info!("Calling uploadFile API: {url}");

        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !file.is_file() {
            return Ok(UpstreamResponse {
                status_code: 404,
                body: json!({ "error": format!("File not found: {}", file.display()) }),
            });
        }
        if !filename.to_lowercase().ends_with(IMPORT_FILE_EXTENSION) {
            return Ok(UpstreamResponse {
                status_code: 400,
                body: json!({ "error": "Only .NTGapps files are supported.", "file": filename }),
            });
        }

        let bytes = tokio::fs::read(file).await?;
        if bytes.is_empty() {
            return Ok(UpstreamResponse {
                status_code: 400,
                body: json!({ "error": "File is empty", "file": filename }),
            });
        }

        let response = send_with_retry("uploadFile", || {
            // Rebuilt per attempt; multipart bodies cannot be cloned.
            let part = multipart::Part::bytes(bytes.clone()).file_name(filename.clone());
            let form = multipart::Form::new().part("file", part);
            apply_session_headers(self.client.post(&url), session_token)
                .header("ngsw-bypass", "true")
                .multipart(form)
                .timeout(UPLOAD_TIMEOUT)
        })
        .await?;

        read_response("uploadFile", response).await
    }

    async fn validate_app_identifier(
        &self,
        payload: &Value,
        session_token: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        let url = format!(
            "{}/rest/importExport/validateAppIdentifier",
            self.effective_base_url(overrides)
        );
        self.post_json(
            "validateAppIdentifier",
            url,
            payload,
            session_token,
            VALIDATE_TIMEOUT,
            false,
        )
        .await
    }

    async fn import_app(
        &self,
        payload: &Value,
        session_token: &str,
        overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        let url = format!(
            "{}/rest/importExport/importApp",
            self.effective_base_url(overrides)
        );
        self.post_json(
            "importApp",
            url,
            payload,
            session_token,
            IMPORT_TIMEOUT,
            true,
        )
        .await
    }
}

/// The backend reads the session token under any of these three header
/// names depending on the deployment; send all of them.
fn apply_session_headers(
    request: reqwest::RequestBuilder,
    session_token: &str,
) -> reqwest::RequestBuilder {
    request
        .header("SessionToken", session_token)
        .header("sessiontoken", session_token)
        .header("X-Session-Token", session_token)
}

/// Send a request, retrying only connection-level failures (connect errors
/// and timeouts) with exponential backoff. HTTP error statuses come back
/// as `Ok` and are never retried.
async fn send_with_retry<F>(context: &'static str, make: F) -> Result<reqwest::Response, GatewayError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0u32;
    loop {
        match make().send().await {
            Ok(response) => return Ok(response),
            Err(e) if (e.is_connect() || e.is_timeout()) && attempt < RETRY_ATTEMPTS => {
                attempt += 1;
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                tracing::warn!(
                    "{context}: connection failure, retrying in {delay:?} \
                     (attempt {attempt}/{RETRY_ATTEMPTS}): {e}"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(GatewayError::Transport(format!("{context}: {e}"))),
        }
    }
}

async fn read_response(
    context: &'static str,
    response: reqwest::Response,
) -> Result<UpstreamResponse, GatewayError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| GatewayError::Transport(format!("{context}: failed to read body: {e}")))?;
    let parsed = serde_json::from_str::<Value>(&text).unwrap_or(Value::Null);

    if status.is_success() {
        let body = if parsed.is_null() && !text.is_empty() {
            Value::String(text)
        } else {
            parsed
        };
        tracing::info!("{context} API response received: status={status}");
        // The backend reports success as 200; other 2xx collapse into it.
        return Ok(UpstreamResponse {
            status_code: 200,
            body,
        });
    }

    tracing::error!("{context} API call failed: status={status}");
    let response_body = if parsed.is_null() {
        Value::String(text)
    } else {
        parsed
    };
    Ok(UpstreamResponse {
        status_code: status.as_u16(),
        body: json!({
            "error": format!("{context} returned {status}"),
            "response_body": response_body,
            "status": status.to_string(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_extraction_tries_keys_in_order() {
        let body = json!({
            "token": "low",
            "UserSessionToken": "primary",
        });
        assert_eq!(extract_session_token(&body).as_deref(), Some("primary"));

        let body = json!({ "userSessionToken": "lower" });
        assert_eq!(extract_session_token(&body).as_deref(), Some("lower"));

        let body = json!({ "UserSessionToken": "   ", "token": "fallback" });
        assert_eq!(extract_session_token(&body).as_deref(), Some("fallback"));

        assert_eq!(extract_session_token(&json!({})), None);
    }
}
