//! MCP (Model Context Protocol) client (§4.8): JSON-RPC 2.0 over HTTP, with
//! capability negotiation, exponential-backoff retry, TTL-cached tool and
//! resource listings, multi-server aggregation into a single
//! [`ToolRegistry`][crate::tool::ToolRegistry], and runtime server add/remove.

pub mod bridge;
pub mod protocol;
pub mod server;
mod transport;

use std::sync::Arc;

use thiserror::Error;

pub use bridge::McpBridge;
pub use protocol::McpResourceDescriptor;
pub use server::McpServerConnection;
pub use transport::RetryStrategy;

use crate::tool::{CancellationToken, Tool, ToolRegistry};

#[derive(Debug, Error)]
pub enum McpError {
    #[error("mcp transport error: {0}")]
    Transport(String),

    #[error("mcp protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("mcp server returned no result")]
    EmptyResult,

    #[error("mcp tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("run was cancelled")]
    Cancelled,

    #[error("failed to close one or more mcp servers: {0}")]
    CloseFailed(String),
}

/// Facade tying together one or more [`McpServerConnection`]s behind a
/// [`McpBridge`], with a convenience method for registering every MCP tool
/// into a local [`ToolRegistry`].
pub struct McpClient {
    bridge: McpBridge,
}

impl McpClient {
    pub fn new(servers: Vec<Arc<McpServerConnection>>) -> Self {
        Self {
            bridge: McpBridge::new(servers),
        }
    }

    pub async fn register_into(&self, registry: &mut ToolRegistry, cancellation: &CancellationToken) -> Result<usize, McpError> {
        let tools = self.bridge.list_tools(cancellation).await?;
        let count = tools.len();
        for tool in tools {
            registry.register(tool);
        }
        Ok(count)
    }

    pub async fn close_all(&self) -> Result<(), McpError> {
        self.bridge.close_all().await
    }

    /// Lists resources across every registered server, paired with the
    /// owning server's name (§4.8/S6).
    pub async fn list_resources(&self, cancellation: &CancellationToken) -> Result<Vec<(String, McpResourceDescriptor)>, McpError> {
        self.bridge.get_all_resources(cancellation).await
    }

    /// Registers a new server at runtime; invalidates the tool cache so the
    /// next `register_into` sees it.
    pub async fn add_server(&self, server: Arc<McpServerConnection>) {
        self.bridge.add_server(server).await;
    }

    /// Removes a server by name at runtime; invalidates the tool cache.
    /// Returns whether a server with that name was registered.
    pub async fn remove_server(&self, name: &str) -> bool {
        self.bridge.remove_server(name).await
    }
}
