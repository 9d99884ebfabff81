//! Wraps MCP server tools as local [`Tool`]s, with TTL-cached tool/resource
//! listings and refresh-in-progress deduplication (§4.8). Grounded in the
//! teacher's `McpToolAdapter`/`register_mcp_tools` (one adapter per MCP tool,
//! delegating `call` to the shared client) but adds the cache layer,
//! multi-server aggregation, and server add/remove the teacher's adapter
//! left to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex as AsyncMutex, RwLock};

use super::protocol::{McpResourceDescriptor, McpToolDescriptor};
use super::server::McpServerConnection;
use crate::cache::{Cache, InMemoryCache};
use crate::mcp::McpError;
use crate::tool::{CancellationToken, ParameterType, Tool, ToolParameter, ToolSchema};
use crate::value::SendableValue;

/// Default TTL for a server's cached `tools/list` result.
pub const DEFAULT_TOOL_LIST_TTL: Duration = Duration::from_secs(60);

/// Default TTL for a server's cached `resources/list` result. `None` means no
/// expiry (kept until manually invalidated); `Some(d)` behaves like the tool
/// cache, including `Some(Duration::ZERO)` effectively disabling caching
/// since such an entry is expired the instant it's read back.
pub const DEFAULT_RESOURCE_LIST_TTL: Option<Duration> = Some(Duration::from_secs(60));

/// Wraps one MCP-reported tool so it can sit in the same [`ToolRegistry`][crate::tool::ToolRegistry]
/// as local tools.
pub struct McpToolAdapter {
    qualified_name: String,
    mcp_name: String,
    description: String,
    connection: Arc<McpServerConnection>,
}

impl McpToolAdapter {
    pub fn new(qualified_name: String, descriptor: &McpToolDescriptor, connection: Arc<McpServerConnection>) -> Self {
        Self {
            qualified_name,
            mcp_name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            connection,
        }
    }
}

#[async_trait]
impl Tool for McpToolAdapter {
    fn name(&self) -> &str {
        &self.qualified_name
    }

    fn spec(&self) -> ToolSchema {
        ToolSchema {
            name: self.qualified_name.clone(),
            description: self.description.clone(),
            // MCP input schemas are arbitrary JSON Schema; coercion happens
            // server-side, so the local parameter list is permissive.
            parameters: vec![ToolParameter {
                name: "arguments".to_string(),
                description: "arguments forwarded verbatim to the MCP tool".to_string(),
                param_type: ParameterType::Any,
                is_required: false,
                default_value: Some(SendableValue::Dict(BTreeMap::new())),
            }],
        }
    }

    async fn call(&self, args: BTreeMap<String, SendableValue>) -> Result<SendableValue, String> {
        let arguments = match args.get("arguments") {
            Some(v) => v.clone(),
            None => SendableValue::Dict(args),
        };
        self.connection
            .call_tool(&self.mcp_name, arguments, &CancellationToken::new())
            .await
            .map_err(|e| e.to_string())
    }
}

/// One registered server plus its own per-kind refresh locks, so a tool-list
/// refresh on one server never blocks a resource-list refresh on another (or
/// on the same server).
struct ServerSlot {
    connection: Arc<McpServerConnection>,
    tool_refresh: AsyncMutex<()>,
    resource_refresh: AsyncMutex<()>,
}

impl ServerSlot {
    fn new(connection: Arc<McpServerConnection>) -> Arc<Self> {
        Arc::new(Self {
            connection,
            tool_refresh: AsyncMutex::new(()),
            resource_refresh: AsyncMutex::new(()),
        })
    }
}

/// Aggregates one or more MCP servers behind cached tool/resource listings.
///
/// Listings are cached per server with a TTL; a concurrent refresh in flight
/// is awaited rather than duplicated, via a per-server refresh lock. Servers
/// can be added or removed at runtime; either invalidates the tool cache
/// (§4.8) since the aggregate tool set changed.
pub struct McpBridge {
    servers: RwLock<Vec<Arc<ServerSlot>>>,
    tool_cache: InMemoryCache<String, Vec<McpToolDescriptor>>,
    resource_cache: InMemoryCache<String, Vec<McpResourceDescriptor>>,
    tool_ttl: Duration,
    resource_ttl: Option<Duration>,
}

impl McpBridge {
    pub fn new(servers: Vec<Arc<McpServerConnection>>) -> Self {
        let slots = servers.into_iter().map(ServerSlot::new).collect();
        Self {
            servers: RwLock::new(slots),
            tool_cache: InMemoryCache::new(),
            resource_cache: InMemoryCache::new(),
            tool_ttl: DEFAULT_TOOL_LIST_TTL,
            resource_ttl: DEFAULT_RESOURCE_LIST_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.tool_ttl = ttl;
        self
    }

    pub fn with_resource_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.resource_ttl = ttl;
        self
    }

    /// Lists tools across all servers, qualifying each tool name with its
    /// server name (`<server>.<tool>`) to avoid collisions.
    pub async fn list_tools(&self, cancellation: &CancellationToken) -> Result<Vec<Box<dyn Tool>>, McpError> {
        let slots = self.servers.read().await.clone();
        let mut tools: Vec<Box<dyn Tool>> = Vec::new();
        for slot in &slots {
            let descriptors = self.tools_for_server(slot, cancellation).await?;
            for descriptor in &descriptors {
                let qualified = format!("{}.{}", slot.connection.name(), descriptor.name);
                tools.push(Box::new(McpToolAdapter::new(qualified, descriptor, Arc::clone(&slot.connection))));
            }
        }
        Ok(tools)
    }

    async fn tools_for_server(&self, slot: &ServerSlot, cancellation: &CancellationToken) -> Result<Vec<McpToolDescriptor>, McpError> {
        let key = slot.connection.name().to_string();
        if let Some(cached) = self.tool_cache.get(&key).await {
            return Ok(cached);
        }

        // Only one refresh per server runs at a time; latecomers wait on the
        // lock and then re-check the cache rather than issuing their own
        // `tools/list` call.
        let _guard = slot.tool_refresh.lock().await;
        if let Some(cached) = self.tool_cache.get(&key).await {
            return Ok(cached);
        }

        let descriptors = slot.connection.list_tools(cancellation).await?;
        self.tool_cache.set(key, descriptors.clone(), Some(self.tool_ttl)).await.ok();
        Ok(descriptors)
    }

    /// Lists resources across all servers, paired with the owning server's
    /// name (S6). Subject to the same TTL/dedup cache discipline as
    /// [`Self::list_tools`].
    pub async fn get_all_resources(&self, cancellation: &CancellationToken) -> Result<Vec<(String, McpResourceDescriptor)>, McpError> {
        let slots = self.servers.read().await.clone();
        let mut resources = Vec::new();
        for slot in &slots {
            let descriptors = self.resources_for_server(slot, cancellation).await?;
            let server_name = slot.connection.name().to_string();
            resources.extend(descriptors.into_iter().map(|d| (server_name.clone(), d)));
        }
        Ok(resources)
    }

    async fn resources_for_server(
        &self,
        slot: &ServerSlot,
        cancellation: &CancellationToken,
    ) -> Result<Vec<McpResourceDescriptor>, McpError> {
        let key = slot.connection.name().to_string();
        if let Some(cached) = self.resource_cache.get(&key).await {
            return Ok(cached);
        }

        let _guard = slot.resource_refresh.lock().await;
        if let Some(cached) = self.resource_cache.get(&key).await {
            return Ok(cached);
        }

        let descriptors = slot.connection.list_resources(cancellation).await?;
        self.resource_cache.set(key, descriptors.clone(), self.resource_ttl).await.ok();
        Ok(descriptors)
    }

    /// Registers a new server and invalidates the tool cache, so the next
    /// `list_tools` call re-queries every server including this one.
    pub async fn add_server(&self, connection: Arc<McpServerConnection>) {
        self.servers.write().await.push(ServerSlot::new(connection));
        self.invalidate_tool_cache().await;
    }

    /// Removes a server by name and invalidates the tool cache. Returns
    /// whether a server with that name was found.
    pub async fn remove_server(&self, name: &str) -> bool {
        let mut servers = self.servers.write().await;
        let before = servers.len();
        servers.retain(|slot| slot.connection.name() != name);
        let removed = servers.len() != before;
        drop(servers);
        if removed {
            self.invalidate_tool_cache().await;
        }
        removed
    }

    pub async fn invalidate_tool_cache(&self) {
        self.tool_cache.clear().await.ok();
    }

    pub async fn invalidate_resource_cache(&self) {
        self.resource_cache.clear().await.ok();
    }

    /// Closes every server connection, collecting per-server failures into a
    /// single composite error while always attempting every close.
    pub async fn close_all(&self) -> Result<(), McpError> {
        let slots = self.servers.read().await.clone();
        let mut failures = Vec::new();
        for slot in &slots {
            if let Err(e) = slot.connection.close().await {
                failures.push(format!("{}: {e}", slot.connection.name()));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(McpError::CloseFailed(failures.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_tools_qualifies_names_with_server_prefix() {
        let server = Arc::new(McpServerConnection::stub(
            "files",
            vec![McpToolDescriptor {
                name: "read".into(),
                description: "reads a file".into(),
                input_schema: serde_json::json!({}),
            }],
        ));
        let bridge = McpBridge::new(vec![server]);
        let tools = bridge.list_tools(&CancellationToken::new()).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "files.read");
    }

    #[tokio::test]
    async fn tool_listing_is_cached_and_not_refetched_before_ttl_expires() {
        let server = Arc::new(McpServerConnection::counting_stub("srv"));
        let bridge = McpBridge::new(vec![Arc::clone(&server)]).with_ttl(Duration::from_secs(60));
        bridge.list_tools(&CancellationToken::new()).await.unwrap();
        bridge.list_tools(&CancellationToken::new()).await.unwrap();
        assert_eq!(server.list_calls(), 1);
    }

    /// **Scenario**: S6 — first `get_all_resources` hits the server; a second
    /// call within the TTL window returns the cache (server call count
    /// unchanged).
    #[tokio::test]
    async fn resource_listing_is_cached_and_not_refetched_before_ttl_expires() {
        let server = Arc::new(McpServerConnection::resource_counting_stub("srv"));
        let bridge = McpBridge::new(vec![Arc::clone(&server)]).with_resource_ttl(Some(Duration::from_secs(60)));
        bridge.get_all_resources(&CancellationToken::new()).await.unwrap();
        bridge.get_all_resources(&CancellationToken::new()).await.unwrap();
        assert_eq!(server.resource_list_calls(), 1);
    }

    /// **Scenario**: S6 — after the TTL expires, the next call refreshes.
    #[tokio::test]
    async fn resource_listing_refreshes_after_ttl_expires() {
        let server = Arc::new(McpServerConnection::resource_counting_stub("srv"));
        let bridge = McpBridge::new(vec![Arc::clone(&server)]).with_resource_ttl(Some(Duration::from_millis(20)));
        bridge.get_all_resources(&CancellationToken::new()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        bridge.get_all_resources(&CancellationToken::new()).await.unwrap();
        assert_eq!(server.resource_list_calls(), 2);
    }

    #[tokio::test]
    async fn get_all_resources_pairs_each_resource_with_its_server_name() {
        let server = Arc::new(McpServerConnection::resource_counting_stub("docs"));
        let bridge = McpBridge::new(vec![server]);
        let resources = bridge.get_all_resources(&CancellationToken::new()).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].0, "docs");
        assert_eq!(resources[0].1.uri, "file:///doc.md");
    }

    /// **Scenario**: §4.8 — adding a server invalidates the tool cache, so a
    /// prior `list_tools` result doesn't shadow the new server's tools.
    #[tokio::test]
    async fn adding_a_server_invalidates_the_tool_cache() {
        let first = Arc::new(McpServerConnection::stub(
            "a",
            vec![McpToolDescriptor {
                name: "one".into(),
                description: String::new(),
                input_schema: serde_json::json!({}),
            }],
        ));
        let bridge = McpBridge::new(vec![first]);
        let before = bridge.list_tools(&CancellationToken::new()).await.unwrap();
        assert_eq!(before.len(), 1);

        let second = Arc::new(McpServerConnection::stub(
            "b",
            vec![McpToolDescriptor {
                name: "two".into(),
                description: String::new(),
                input_schema: serde_json::json!({}),
            }],
        ));
        bridge.add_server(second).await;

        let after = bridge.list_tools(&CancellationToken::new()).await.unwrap();
        assert_eq!(after.len(), 2);
    }

    /// **Scenario**: §4.8 — removing a server invalidates the tool cache and
    /// drops that server's tools from subsequent listings.
    #[tokio::test]
    async fn removing_a_server_invalidates_the_tool_cache() {
        let a = Arc::new(McpServerConnection::stub(
            "a",
            vec![McpToolDescriptor {
                name: "one".into(),
                description: String::new(),
                input_schema: serde_json::json!({}),
            }],
        ));
        let b = Arc::new(McpServerConnection::stub(
            "b",
            vec![McpToolDescriptor {
                name: "two".into(),
                description: String::new(),
                input_schema: serde_json::json!({}),
            }],
        ));
        let bridge = McpBridge::new(vec![a, b]);
        assert_eq!(bridge.list_tools(&CancellationToken::new()).await.unwrap().len(), 2);

        let removed = bridge.remove_server("b").await;
        assert!(removed);
        assert!(!bridge.remove_server("missing").await);

        let after = bridge.list_tools(&CancellationToken::new()).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].name(), "a.one");
    }
}
