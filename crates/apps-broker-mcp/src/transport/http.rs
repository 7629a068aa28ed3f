//! HTTP transport — JSON-RPC over POST /mcp with an optional bearer gate,
//! plus an unauthenticated /health endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::protocol::ProtocolHandler;
use crate::types::{error_codes, McpError, McpResult};

pub struct ServerState {
    pub token: Option<String>,
    pub handler: ProtocolHandler,
}

pub struct HttpTransport {
    state: Arc<ServerState>,
}

impl HttpTransport {
    pub fn new(handler: ProtocolHandler, token: Option<String>) -> Self {
        Self {
            state: Arc::new(ServerState { token, handler }),
        }
    }

    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let app = Router::new()
            .route("/mcp", post(handle_mcp))
            .route("/health", get(handle_health))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone());

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!("HTTP transport listening on {addr}");

        axum::serve(listener, app)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }
}

/// Bearer gate runs before any dispatch. Failures are JSON-RPC errors in a
/// 200 response, the shape MCP bridges expect.
async fn handle_mcp(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let id = body.get("id").cloned().unwrap_or(Value::Null);

    if let Some(expected) = &state.token {
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .is_some_and(|token| token == expected);

        if !authorized {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": error_codes::UNAUTHORIZED, "message": "Unauthorized" }
            }));
        }
    }

    let msg = match serde_json::from_value(body) {
        Ok(msg) => msg,
        Err(e) => {
            return Json(json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {
                    "code": error_codes::PARSE_ERROR,
                    "message": "Parse error",
                    "data": { "error": e.to_string() }
                }
            }));
        }
    };

    match state.handler.handle_message(msg).await {
        Some(response) => Json(response),
        None => Json(Value::Null),
    }
}

async fn handle_health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
