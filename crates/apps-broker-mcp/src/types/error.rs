//! Protocol-level error types and JSON-RPC error codes.
//!
//! These cover envelope problems only. Business failures from the action
//! handlers never appear here — they travel inside successful tool-call
//! results as structured error objects.

use serde_json::{json, Value};

use super::message::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Server: missing or invalid bearer token (HTTP transport only).
    pub const UNAUTHORIZED: i32 = -32001;
}

/// All protocol-level errors the server can report.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found")]
    MethodNotFound(String),

    #[error("Invalid params")]
    InvalidParams(String),

    #[error("Internal error")]
    InternalError(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        match self {
            McpError::ParseError(_) | McpError::Json(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => INVALID_PARAMS,
            McpError::InternalError(_) | McpError::Transport(_) | McpError::Io(_) => INTERNAL_ERROR,
            McpError::Unauthorized => UNAUTHORIZED,
        }
    }

    /// Structured context for the JSON-RPC `error.data` field.
    fn data(&self) -> Option<Value> {
        match self {
            McpError::ParseError(detail) => Some(json!({ "error": detail })),
            McpError::MethodNotFound(method) => Some(json!({ "method": method })),
            McpError::InvalidParams(detail) | McpError::InternalError(detail) => {
                Some(json!({ "error": detail }))
            }
            _ => None,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::new(id, self.code(), self.to_string(), self.data())
    }
}

pub type McpResult<T> = Result<T, McpError>;
