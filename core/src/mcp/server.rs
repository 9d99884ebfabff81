//! A single negotiated MCP server connection: the `initialize` handshake,
//! capability tracking, and the `tools/call` / `tools/list` / `resources/*`
//! operations layered on top of [`HttpTransport`].

use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use super::protocol::{
    CallToolResult, InitializeParams, InitializeResult, ListResourcesResult, ListToolsResult, McpCapabilities,
    McpResourceDescriptor, McpToolDescriptor, METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_RESOURCES_LIST,
    METHOD_RESOURCES_READ, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use super::transport::{HttpTransport, RetryStrategy};
use crate::mcp::McpError;
use crate::tool::CancellationToken;
use crate::value::SendableValue;

pub struct McpServerConnection {
    name: String,
    transport: Option<HttpTransport>,
    capabilities: Mutex<Option<McpCapabilities>>,
    #[cfg(test)]
    stub: Option<StubConnection>,
}

impl McpServerConnection {
    pub fn new(name: impl Into<String>, url: impl Into<String>, headers: Vec<(String, String)>) -> Self {
        Self {
            name: name.into(),
            transport: Some(HttpTransport::new(url, headers, Duration::from_secs(30), RetryStrategy::default())),
            capabilities: Mutex::new(None),
            #[cfg(test)]
            stub: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Performs the `initialize`/`notifications/initialized` handshake once
    /// and caches the negotiated capabilities.
    pub async fn initialize(&self, cancellation: &CancellationToken) -> Result<McpCapabilities, McpError> {
        if let Some(caps) = self.capabilities.lock().unwrap().clone() {
            return Ok(caps);
        }
        #[cfg(test)]
        if self.stub.is_some() {
            let caps = McpCapabilities {
                tools: true,
                ..Default::default()
            };
            *self.capabilities.lock().unwrap() = Some(caps.clone());
            return Ok(caps);
        }

        let transport = self.transport.as_ref().expect("transport present outside stub mode");
        let params = InitializeParams::new("weave-agent-core", env!("CARGO_PKG_VERSION"));
        let raw = transport
            .request(METHOD_INITIALIZE, Some(serde_json::to_value(&params).unwrap()), cancellation)
            .await?;
        let result: InitializeResult = serde_json::from_value(raw).map_err(|e| McpError::Transport(e.to_string()))?;
        transport.notify(METHOD_INITIALIZED, None).await.ok();

        let caps = result.parsed_capabilities();
        *self.capabilities.lock().unwrap() = Some(caps.clone());
        Ok(caps)
    }

    pub async fn list_tools(&self, cancellation: &CancellationToken) -> Result<Vec<McpToolDescriptor>, McpError> {
        self.initialize(cancellation).await?;

        #[cfg(test)]
        if let Some(stub) = &self.stub {
            return Ok(stub.list_tools());
        }

        let transport = self.transport.as_ref().expect("transport present outside stub mode");
        let raw = transport.request(METHOD_TOOLS_LIST, None, cancellation).await?;
        let result: ListToolsResult = serde_json::from_value(raw).map_err(|e| McpError::Transport(e.to_string()))?;
        Ok(result.tools)
    }

    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: SendableValue,
        cancellation: &CancellationToken,
    ) -> Result<SendableValue, McpError> {
        self.initialize(cancellation).await?;

        #[cfg(test)]
        if let Some(stub) = &self.stub {
            return Ok(stub.call_tool());
        }

        let transport = self.transport.as_ref().expect("transport present outside stub mode");
        let params: Value = serde_json::json!({
            "name": tool_name,
            "arguments": Value::from(arguments),
        });
        let raw = transport.request(METHOD_TOOLS_CALL, Some(params), cancellation).await?;
        let result: CallToolResult = serde_json::from_value(raw).map_err(|e| McpError::Transport(e.to_string()))?;
        let text = result
            .content
            .into_iter()
            .filter_map(|item| item.text)
            .collect::<Vec<_>>()
            .join("\n");
        if result.is_error {
            return Err(McpError::ToolCallFailed(text));
        }
        Ok(SendableValue::String(text))
    }

    pub async fn list_resources(&self, cancellation: &CancellationToken) -> Result<Vec<McpResourceDescriptor>, McpError> {
        self.initialize(cancellation).await?;

        #[cfg(test)]
        if let Some(stub) = &self.stub {
            return Ok(stub.list_resources());
        }

        let transport = self.transport.as_ref().expect("transport present outside stub mode");
        let raw = transport.request(METHOD_RESOURCES_LIST, None, cancellation).await?;
        let result: ListResourcesResult = serde_json::from_value(raw).map_err(|e| McpError::Transport(e.to_string()))?;
        Ok(result.resources)
    }

    pub async fn read_resource(&self, uri: &str, cancellation: &CancellationToken) -> Result<Value, McpError> {
        self.initialize(cancellation).await?;
        let transport = self.transport.as_ref().expect("transport present outside stub mode");
        transport
            .request(METHOD_RESOURCES_READ, Some(serde_json::json!({ "uri": uri })), cancellation)
            .await
    }

    pub async fn close(&self) -> Result<(), McpError> {
        *self.capabilities.lock().unwrap() = None;
        Ok(())
    }

    #[cfg(test)]
    pub fn stub(name: &str, tools: Vec<McpToolDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            transport: None,
            capabilities: Mutex::new(None),
            stub: Some(StubConnection {
                tools,
                calls: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
                resources: Vec::new(),
                resource_calls: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            }),
        }
    }

    #[cfg(test)]
    pub fn counting_stub(name: &str) -> Self {
        Self::stub(
            name,
            vec![McpToolDescriptor {
                name: "noop".into(),
                description: String::new(),
                input_schema: serde_json::json!({}),
            }],
        )
    }

    /// A stub reporting one resource, with its `resources/list` calls counted
    /// (used to exercise the resource cache's TTL/dedup behavior).
    #[cfg(test)]
    pub fn resource_counting_stub(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transport: None,
            capabilities: Mutex::new(None),
            stub: Some(StubConnection {
                tools: Vec::new(),
                calls: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
                resources: vec![McpResourceDescriptor {
                    uri: "file:///doc.md".into(),
                    name: "doc".into(),
                    description: String::new(),
                    mime_type: None,
                }],
                resource_calls: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
            }),
        }
    }

    #[cfg(test)]
    pub fn list_calls(&self) -> usize {
        self.stub
            .as_ref()
            .map(|s| s.calls.load(std::sync::atomic::Ordering::SeqCst))
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub fn resource_list_calls(&self) -> usize {
        self.stub
            .as_ref()
            .map(|s| s.resource_calls.load(std::sync::atomic::Ordering::SeqCst))
            .unwrap_or(0)
    }
}

#[cfg(test)]
struct StubConnection {
    tools: Vec<McpToolDescriptor>,
    calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    resources: Vec<McpResourceDescriptor>,
    resource_calls: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

#[cfg(test)]
impl StubConnection {
    fn list_tools(&self) -> Vec<McpToolDescriptor> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.tools.clone()
    }

    fn list_resources(&self) -> Vec<McpResourceDescriptor> {
        self.resource_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.resources.clone()
    }

    fn call_tool(&self) -> SendableValue {
        SendableValue::String("stub-ok".to_string())
    }
}
