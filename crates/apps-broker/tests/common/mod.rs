//! Shared test doubles for the gateway ports.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use apps_broker::{
    AppError, AppsGateway, AuthGateway, GatewayError, LoginResult, Outcome, UpstreamOverrides,
    UpstreamResponse,
};

/// Auth gateway returning a fixed token, or failing when none is set.
pub struct FakeAuthGateway {
    pub token: Option<String>,
}

impl FakeAuthGateway {
    pub fn returning(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl AuthGateway for FakeAuthGateway {
    async fn login(
        &self,
        username: &str,
        _password: &str,
        companyname: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<LoginResult, GatewayError> {
        match &self.token {
            Some(token) => Ok(LoginResult {
                session_token: token.clone(),
                body: json!({
                    "UserSessionToken": token,
                    "user": format!("{companyname}/{username}"),
                }),
            }),
            None => Err(GatewayError::MissingSessionToken),
        }
    }
}

/// One scripted upstream call outcome.
pub enum ScriptedCall {
    Ok(u16, Value),
    TransportFail,
}

impl Default for ScriptedCall {
    fn default() -> Self {
        ScriptedCall::Ok(200, json!({}))
    }
}

impl ScriptedCall {
    fn resolve(&self, name: &'static str) -> Result<UpstreamResponse, GatewayError> {
        match self {
            ScriptedCall::Ok(status, body) => Ok(UpstreamResponse {
                status_code: *status,
                body: body.clone(),
            }),
            ScriptedCall::TransportFail => {
                Err(GatewayError::Transport(format!("{name}: connection refused")))
            }
        }
    }
}

/// Apps gateway with scripted responses and a call log.
#[derive(Default)]
pub struct FakeAppsGateway {
    pub save: ScriptedCall,
    pub upload: ScriptedCall,
    pub validate: ScriptedCall,
    pub import: ScriptedCall,
    pub calls: Mutex<Vec<&'static str>>,
    pub tokens_seen: Mutex<Vec<String>>,
    pub uploaded_files: Mutex<Vec<PathBuf>>,
    pub save_specs: Mutex<Vec<Value>>,
    pub import_payloads: Mutex<Vec<Value>>,
}

impl FakeAppsGateway {
    fn record(&self, name: &'static str, session_token: &str) {
        self.calls.lock().unwrap().push(name);
        self.tokens_seen
            .lock()
            .unwrap()
            .push(session_token.to_string());
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AppsGateway for FakeAppsGateway {
    async fn save_app(
        &self,
        spec: &Value,
        session_token: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        self.record("saveApp", session_token);
        self.save_specs.lock().unwrap().push(spec.clone());
        self.save.resolve("saveApp")
    }

    async fn upload_import_file(
        &self,
        file: &Path,
        session_token: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        self.record("uploadFile", session_token);
        self.uploaded_files.lock().unwrap().push(file.to_path_buf());
        self.upload.resolve("uploadFile")
    }

    async fn validate_app_identifier(
        &self,
        _payload: &Value,
        session_token: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        self.record("validateAppIdentifier", session_token);
        self.validate.resolve("validateAppIdentifier")
    }

    async fn import_app(
        &self,
        payload: &Value,
        session_token: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        self.record("importApp", session_token);
        self.import_payloads.lock().unwrap().push(payload.clone());
        self.import.resolve("importApp")
    }
}

/// Parameters map from a `json!` object literal.
pub fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("expected a JSON object")
}

pub fn expect_success(outcome: Outcome) -> Value {
    match outcome {
        Outcome::Success { result, .. } => result,
        Outcome::Failure { error, .. } => panic!("expected success, got failure: {error:?}"),
    }
}

pub fn expect_failure(outcome: Outcome) -> AppError {
    match outcome {
        Outcome::Failure { error, .. } => error,
        Outcome::Success { result, .. } => panic!("expected failure, got success: {result}"),
    }
}
