//! Error taxonomy shared by every action handler.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable error codes carried on handler-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Bad caller input.
    ValidationFailed,
    /// Missing or rejected session.
    Forbidden,
    /// Local file resolution failed.
    NotFound,
    /// Upstream call returned a non-success status.
    UpstreamError,
    /// Unexpected failure inside a handler.
    InternalError,
    /// Unrecognized dispatch target.
    InvalidAction,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            ErrorCode::ValidationFailed => "validation_failed",
            ErrorCode::Forbidden => "forbidden",
            ErrorCode::NotFound => "not_found",
            ErrorCode::UpstreamError => "upstream_error",
            ErrorCode::InternalError => "internal_error",
            ErrorCode::InvalidAction => "invalid_action",
        };
        write!(f, "{code}")
    }
}

/// Application error with code, message, and optional structured context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details: Some(details),
        }
    }
}
