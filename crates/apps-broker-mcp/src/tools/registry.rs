//! Tool registration. Execution lives in the core dispatcher; this module
//! only describes the callable surface.

use serde_json::json;

use crate::types::ToolDefinition;

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            ping_definition(),
            login_definition(),
            create_app_definition(),
            import_app_definition(),
        ]
    }
}

fn ping_definition() -> ToolDefinition {
    ToolDefinition {
        name: "ping".to_string(),
        description: "Health check: returns pong.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
    }
}

fn login_definition() -> ToolDefinition {
    ToolDefinition {
        name: "login".to_string(),
        description: "Login and store session token server-side keyed by clientId.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "username": { "type": "string" },
                "password": { "type": "string" },
                "companyname": { "type": "string" },
                "clientId": { "type": "string" }
            },
            "required": ["username", "password", "companyname", "clientId"],
            "additionalProperties": false
        }),
    }
}

fn create_app_definition() -> ToolDefinition {
    ToolDefinition {
        name: "create_app".to_string(),
        description: "Create app via saveApp. You can provide only appName; other fields \
                      are optional and will be auto-filled."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "clientId": { "type": "string" },
                "sessionToken": {
                    "type": "string",
                    "description": "Optional. If provided, bypasses stored login session and uses this token for the call."
                },
                "AppearOnMobile": { "type": "boolean", "description": "Optional. Default: true" },
                "appName": { "type": "string", "description": "Required. App display name." },
                "appIdentifier": {
                    "type": "string",
                    "description": "Optional. Default: derived 3-letter code from appName."
                },
                "shortNotes": { "type": "string", "description": "Optional. Default: appName" },
                "icon": { "type": "string", "description": "Optional. Default: fa fa-heart" }
            },
            "required": ["appName"],
            "additionalProperties": false
        }),
    }
}

fn import_app_definition() -> ToolDefinition {
    ToolDefinition {
        name: "import_app".to_string(),
        description: "Import an app from broker storage by appName using Import/Export APIs \
                      (uploadFile -> validateAppIdentifier -> importApp)."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "clientId": { "type": "string" },
                "sessionToken": {
                    "type": "string",
                    "description": "Optional. If provided, bypasses stored login session and uses this token for the call."
                },
                "appName": {
                    "type": "string",
                    "description": "Required. App name (folder name under MCP_IMPORT_APPS_DIR). Server chooses the newest file in that folder."
                },
                "newAppIdentifier": {
                    "type": "string",
                    "description": "Optional. Used only if the app already exists. New 3-letter identifier to import under."
                },
                "newAppName": {
                    "type": "string",
                    "description": "Optional. Used only if the app already exists. New app name to import under."
                },
                "debug": {
                    "type": "boolean",
                    "description": "Optional. If true, include full upstream API payloads for debugging. Default: false."
                }
            },
            "required": ["appName"],
            "additionalProperties": false
        }),
    }
}
