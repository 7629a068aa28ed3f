//! Main protocol handler — receives JSON-RPC messages, routes methods, and
//! bridges `tools/call` into the core dispatcher.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use apps_broker::{ActionRequest, Outcome, RequestDispatcher, UpstreamOverrides};

use crate::tools::ToolRegistry;
use crate::types::*;

use super::validator::validate_request;

pub struct ProtocolHandler {
    dispatcher: Arc<RequestDispatcher>,
    /// When false, authBaseUrl/appsBaseUrl arguments are ignored.
    override_enabled: bool,
}

impl ProtocolHandler {
    pub fn new(dispatcher: Arc<RequestDispatcher>, override_enabled: bool) -> Self {
        Self {
            dispatcher,
            override_enabled,
        }
    }

    /// `shutdown`/`exit` get a normal `{}` response; the stdio transport
    /// stops its read loop after writing it.
    pub fn is_exit_method(method: &str) -> bool {
        matches!(method, "shutdown" | "exit")
    }

    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                tracing::debug!("Ignoring notification: {}", notification.method);
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return serde_json::to_value(e.to_json_rpc_error(request.id)).unwrap_or_default();
        }

        let id = request.id.clone();
        match self.dispatch_request(&request).await {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id, value)).unwrap_or_default(),
            Err(e) => serde_json::to_value(e.to_json_rpc_error(id)).unwrap_or_default(),
        }
    }

    async fn dispatch_request(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.clone()),

            "tools/list" => {
                let result = ToolListResult {
                    tools: ToolRegistry::list_tools(),
                };
                serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
            }
            "tools/call" => self.handle_tools_call(request.params.clone()).await,

            "ping" => Ok(Value::Object(Map::new())),
            "shutdown" | "exit" => {
                tracing::info!("Shutdown requested");
                Ok(Value::Object(Map::new()))
            }

            _ => Err(McpError::MethodNotFound(request.method.clone())),
        }
    }

    fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        // Lenient by design: clients vary in what they send here and none
        // of it changes our behavior.
        if let Some(init) = params.and_then(|p| serde_json::from_value::<InitializeParams>(p).ok())
        {
            if let Some(client) = init.client_info {
                tracing::info!("Initialized with client: {} v{}", client.name, client.version);
            }
            if let Some(version) = init.protocol_version {
                if version != MCP_VERSION {
                    tracing::warn!(
                        "Client requested protocol version {version}, server speaks {MCP_VERSION}"
                    );
                }
            }
        }

        serde_json::to_value(InitializeResult::default_result())
            .map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Missing 'name' in params".to_string()))?;

        let arguments = call.arguments.unwrap_or_default();
        let client_id = arguments
            .get("clientId")
            .and_then(Value::as_str)
            .map(str::to_string);

        let overrides = if self.override_enabled {
            UpstreamOverrides::new(
                arguments.get("authBaseUrl").and_then(Value::as_str),
                arguments.get("appsBaseUrl").and_then(Value::as_str),
            )
        } else {
            UpstreamOverrides::none()
        };

        let request = ActionRequest::new(call.name, arguments);
        let outcome = self
            .dispatcher
            .execute(request, client_id.as_deref(), &overrides)
            .await;

        // Business failures are protocol-level successes carrying a
        // structured error object — only envelope problems become JSON-RPC
        // errors. Clients rely on this asymmetry.
        let text = match outcome {
            Outcome::Success { result, .. } => serde_json::to_string(&result),
            Outcome::Failure { error, .. } => serde_json::to_string(&json!({
                "code": error.code,
                "message": error.message,
                "details": error.details.unwrap_or_else(|| json!({})),
            })),
        }
        .map_err(|e| McpError::InternalError(e.to_string()))?;

        serde_json::to_value(ToolCallResult::text(text))
            .map_err(|e| McpError::InternalError(e.to_string()))
    }
}
