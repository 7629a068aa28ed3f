//! Protocol-level integration tests: envelope handling, method routing,
//! and the business-failure-as-success contract.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use apps_broker::{
    AppsGateway, AuthGateway, GatewayError, LoginResult, RequestDispatcher, SessionStore,
    UpstreamOverrides, UpstreamResponse,
};

use apps_broker_mcp::protocol::ProtocolHandler;
use apps_broker_mcp::transport::framing;
use apps_broker_mcp::types::JsonRpcMessage;

// ─────────────────────── helpers ───────────────────────

struct StaticAuth;

#[async_trait]
impl AuthGateway for StaticAuth {
    async fn login(
        &self,
        _username: &str,
        _password: &str,
        _companyname: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<LoginResult, GatewayError> {
        Ok(LoginResult {
            session_token: "T1".to_string(),
            body: json!({ "UserSessionToken": "T1" }),
        })
    }
}

struct StaticApps;

#[async_trait]
impl AppsGateway for StaticApps {
    async fn save_app(
        &self,
        _spec: &Value,
        _session_token: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        Ok(UpstreamResponse {
            status_code: 200,
            body: json!({ "id": "app-1" }),
        })
    }

    async fn upload_import_file(
        &self,
        _file: &Path,
        _session_token: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        Ok(UpstreamResponse {
            status_code: 200,
            body: json!({}),
        })
    }

    async fn validate_app_identifier(
        &self,
        _payload: &Value,
        _session_token: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        Ok(UpstreamResponse {
            status_code: 200,
            body: json!({}),
        })
    }

    async fn import_app(
        &self,
        _payload: &Value,
        _session_token: &str,
        _overrides: &UpstreamOverrides,
    ) -> Result<UpstreamResponse, GatewayError> {
        Ok(UpstreamResponse {
            status_code: 200,
            body: json!({}),
        })
    }
}

fn handler() -> ProtocolHandler {
    handler_with_sessions(SessionStore::new(None, None))
}

fn handler_with_sessions(sessions: SessionStore) -> ProtocolHandler {
    let dispatcher = Arc::new(RequestDispatcher::new(
        Arc::new(StaticAuth),
        Arc::new(StaticApps),
        Arc::new(sessions),
        "storage/import-apps",
    ));
    ProtocolHandler::new(dispatcher, true)
}

fn rpc_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

async fn send(handler: &ProtocolHandler, msg: Value) -> Value {
    let parsed: JsonRpcMessage = serde_json::from_value(msg).unwrap();
    handler
        .handle_message(parsed)
        .await
        .expect("expected a response")
}

/// Decode the text envelope a tool call wraps its payload in.
fn tool_text(response: &Value) -> Value {
    let text = response["result"]["content"][0]["text"]
        .as_str()
        .expect("expected text content");
    serde_json::from_str(text).unwrap()
}

// ─────────────────────── tests ───────────────────────

#[tokio::test]
async fn initialize_reports_server_identity() {
    let handler = handler();
    let resp = send(
        &handler,
        rpc_request(
            0,
            "initialize",
            json!({
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "test-client", "version": "1.0" }
            }),
        ),
    )
    .await;

    let result = &resp["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "apps-broker-mcp");
    assert!(result["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn initialize_without_params_still_succeeds() {
    let handler = handler();
    let resp = send(&handler, json!({ "jsonrpc": "2.0", "id": 0, "method": "initialize" })).await;
    assert_eq!(resp["result"]["serverInfo"]["name"], "apps-broker-mcp");
}

#[tokio::test]
async fn tools_list_names_the_four_tools() {
    let handler = handler();
    let resp = send(&handler, rpc_request(1, "tools/list", json!({}))).await;

    let names: Vec<&str> = resp["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["ping", "login", "create_app", "import_app"]);
}

#[tokio::test]
async fn unknown_method_is_a_json_rpc_error() {
    let handler = handler();
    let resp = send(&handler, rpc_request(1, "foo/bar", json!({}))).await;

    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["data"]["method"], "foo/bar");
}

#[tokio::test]
async fn tool_call_without_name_is_invalid_params() {
    let handler = handler();
    let resp = send(&handler, rpc_request(1, "tools/call", json!({ "arguments": {} }))).await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn ping_tool_returns_pong_in_text_envelope() {
    let handler = handler();
    let resp = send(
        &handler,
        rpc_request(1, "tools/call", json!({ "name": "ping", "arguments": {} })),
    )
    .await;

    assert_eq!(tool_text(&resp)["message"], "pong");
}

#[tokio::test]
async fn business_failure_is_a_protocol_success() {
    let handler = handler();
    // No session stored and no default configured: the handler fails, but
    // the JSON-RPC layer reports success with the error encoded in text.
    let resp = send(
        &handler,
        rpc_request(
            1,
            "tools/call",
            json!({ "name": "create_app", "arguments": { "appName": "Foo" } }),
        ),
    )
    .await;

    assert!(resp.get("error").is_none(), "expected result, got: {resp}");
    let payload = tool_text(&resp);
    assert_eq!(payload["code"], "forbidden");
    assert_eq!(payload["message"], "you must log in first");
    assert!(payload["details"].is_object());
}

#[tokio::test]
async fn unknown_tool_is_a_business_failure_too() {
    let handler = handler_with_sessions(SessionStore::new(Some("T".to_string()), None));
    let resp = send(
        &handler,
        rpc_request(1, "tools/call", json!({ "name": "no_such_tool", "arguments": {} })),
    )
    .await;

    let payload = tool_text(&resp);
    assert_eq!(payload["code"], "invalid_action");
    assert_eq!(payload["details"]["action"], "no_such_tool");
}

#[tokio::test]
async fn login_then_create_app_flows_through_the_session_store() {
    let handler = handler();

    let resp = send(
        &handler,
        rpc_request(
            1,
            "tools/call",
            json!({
                "name": "login",
                "arguments": { "username": "u", "password": "p", "companyname": "c" }
            }),
        ),
    )
    .await;
    let login = tool_text(&resp);
    assert_eq!(login["sessionToken"], "T1");
    assert_eq!(login["clientId"], "c::u");

    let resp = send(
        &handler,
        rpc_request(
            2,
            "tools/call",
            json!({
                "name": "create_app",
                "arguments": { "appName": "Foo", "clientId": "c::u" }
            }),
        ),
    )
    .await;
    let created = tool_text(&resp);
    assert_eq!(created["app"]["appName"], "Foo");
    assert_eq!(created["appsService"]["status_code"], 200);
}

#[tokio::test]
async fn import_app_with_no_package_on_disk_reports_not_found() {
    let root = tempfile::tempdir().unwrap();
    let dispatcher = Arc::new(RequestDispatcher::new(
        Arc::new(StaticAuth),
        Arc::new(StaticApps),
        Arc::new(SessionStore::new(Some("T".to_string()), None)),
        root.path(),
    ));
    let handler = ProtocolHandler::new(dispatcher, true);

    let resp = send(
        &handler,
        rpc_request(
            1,
            "tools/call",
            json!({ "name": "import_app", "arguments": { "appName": "Ghost" } }),
        ),
    )
    .await;

    let payload = tool_text(&resp);
    assert_eq!(payload["code"], "not_found");
    assert_eq!(payload["details"]["appName"], "Ghost");
}

#[tokio::test]
async fn shutdown_and_exit_respond_with_empty_results() {
    let handler = handler();
    for method in ["shutdown", "exit"] {
        let resp = send(&handler, rpc_request(9, method, json!(null))).await;
        assert!(resp["result"].as_object().unwrap().is_empty());
        assert!(ProtocolHandler::is_exit_method(method));
    }
    assert!(!ProtocolHandler::is_exit_method("ping"));
}

#[tokio::test]
async fn notifications_get_no_response() {
    let handler = handler();
    let msg: JsonRpcMessage = serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }))
    .unwrap();
    assert!(handler.handle_message(msg).await.is_none());
}

#[tokio::test]
async fn parse_errors_carry_the_standard_code() {
    let err = framing::parse_message(r#"{"nope"#).unwrap_err();
    assert_eq!(err.code(), -32700);
}
