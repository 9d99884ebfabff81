//! MCP wire protocol: JSON-RPC 2.0 request/response envelope and the
//! `initialize`/`tools/list`/`tools/call`/`resources/list`/`resources/read`
//! payload shapes (§6.1). Authored in-crate rather than depending on an
//! external MCP SDK, since the MCP client itself is in scope to build.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version advertised during `initialize` (§6.1).
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_INITIALIZED: &str = "notifications/initialized";
pub const METHOD_TOOLS_LIST: &str = "tools/list";
pub const METHOD_TOOLS_CALL: &str = "tools/call";
pub const METHOD_RESOURCES_LIST: &str = "resources/list";
pub const METHOD_RESOURCES_READ: &str = "resources/read";

/// Reserved JSON-RPC 2.0 error codes (§7).
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// `id` is a fresh UUID string per call (§4.8 step 1, §6.1).
    pub fn new(id: impl Into<String>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC notification: no `id`, no response expected.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// Whether `code` should ever be retried. §6.4/§7: malformed-request class
/// errors (-32600 invalid request, -32601 method not found, -32602 invalid
/// params) are never retryable — retrying them cannot succeed.
pub fn is_retryable_error_code(code: i64) -> bool {
    !matches!(code, INVALID_REQUEST | METHOD_NOT_FOUND | INVALID_PARAMS)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct McpCapabilities {
    #[serde(default)]
    pub tools: bool,
    #[serde(default)]
    pub resources: bool,
    #[serde(default)]
    pub prompts: bool,
    #[serde(default)]
    pub sampling: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientIdentity {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: &'static str,
    pub capabilities: Value,
    pub client_info: ClientIdentity,
}

impl InitializeParams {
    pub fn new(client_name: impl Into<String>, client_version: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            capabilities: serde_json::json!({}),
            client_info: ClientIdentity {
                name: client_name.into(),
                version: client_version.into(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    #[serde(default)]
    pub protocol_version: Option<String>,
    #[serde(default)]
    pub capabilities: Value,
}

impl InitializeResult {
    /// Parses the raw `capabilities` object into [`McpCapabilities`]: each
    /// top-level key present and non-null counts as supported.
    pub fn parsed_capabilities(&self) -> McpCapabilities {
        McpCapabilities {
            tools: self.capabilities.get("tools").is_some(),
            resources: self.capabilities.get("resources").is_some(),
            prompts: self.capabilities.get("prompts").is_some(),
            sampling: self.capabilities.get("sampling").is_some(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<McpToolDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpResourceDescriptor {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListResourcesResult {
    #[serde(default)]
    pub resources: Vec<McpResourceDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolContentItem {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContentItem>,
    #[serde(default)]
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_version_matches_external_interface_contract() {
        assert_eq!(PROTOCOL_VERSION, "2024-11-05");
    }

    #[test]
    fn malformed_request_codes_are_not_retryable() {
        assert!(!is_retryable_error_code(INVALID_REQUEST));
        assert!(!is_retryable_error_code(METHOD_NOT_FOUND));
        assert!(!is_retryable_error_code(INVALID_PARAMS));
        assert!(is_retryable_error_code(INTERNAL_ERROR));
        assert!(is_retryable_error_code(-32000));
    }

    #[test]
    fn initialize_params_serialize_with_protocol_version() {
        let params = InitializeParams::new("weave", "0.1.0");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["protocolVersion"], "2024-11-05");
    }
}
