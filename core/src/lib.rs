//! # weave-core
//!
//! A multi-agent orchestration runtime: typed tool calling with schema
//! coercion, guardrails, four agent strategies (tool-calling, ReAct, chat,
//! plan-and-execute), an orchestration tree for composing agents into
//! pipelines, agent-to-agent handoffs, and an MCP client for external tool
//! servers.
//!
//! ## Design principles
//!
//! - **One pipeline, many strategies**: every agent run goes through the same
//!   nine-step lifecycle ([`agent::AgentRuntime::run`]); what varies is the
//!   inner loop, modeled as a closed [`agent::strategy::Strategy`] enum.
//! - **Schema at the boundary**: tool arguments are normalized (defaults,
//!   then coercion, then validation) once, in [`tool::schema`], so strategies
//!   never see raw untyped JSON.
//! - **Guardrails are generic**: the same [`guardrail::GuardrailRunner`]
//!   enforces input/output checks at the agent boundary and the tool
//!   boundary.
//! - **Composable orchestration**: [`orchestration::OrchestrationStep`] trees
//!   validate at construction time (cycle detection, duplicate branch names)
//!   before anything runs.
//!
//! ## Main modules
//!
//! - [`value`]: [`value::SendableValue`] — the tagged-value ABI for tool
//!   arguments and results.
//! - [`message`]: [`message::Message`] — System / User / Assistant / Tool.
//! - [`tool`]: [`tool::Tool`] trait, [`tool::ToolRegistry`], schema
//!   normalization, the `execute` protocol, and [`tool::parallel`] fan-out.
//! - [`guardrail`]: [`guardrail::GuardrailCheck`], [`guardrail::GuardrailRunner`].
//! - [`inference`]: [`inference::InferenceProvider`] trait and
//!   [`inference::mock::MockProvider`].
//! - [`agent`]: [`agent::AgentRuntime`], [`agent::strategy::Strategy`].
//! - [`orchestration`]: [`orchestration::OrchestrationStep`],
//!   [`orchestration::BlueprintRegistry`], agent handoffs.
//! - [`mcp`]: [`mcp::McpClient`] — JSON-RPC 2.0 client for MCP tool servers.
//! - [`session`]: [`session::Session`] trait and [`session::InMemorySession`].
//! - [`cache`]: [`cache::Cache`], [`cache::InMemoryCache`].
//! - [`event`]: [`event::AgentEvent`], bridged to the wire-level
//!   `weave_events::ProtocolEvent`.
//! - [`error`]: [`error::AgentError`], the error type returned by agent runs,
//!   tool execution, and orchestration.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use weave_core::agent::strategy::Strategy;
//! use weave_core::agent::{AgentConfiguration, AgentContext, AgentRuntime, NoopHooks};
//! use weave_core::inference::mock::MockProvider;
//! use weave_core::tool::{CancellationToken, ToolRegistry};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let runtime = AgentRuntime {
//!     configuration: AgentConfiguration::new("assistant"),
//!     provider: Arc::new(MockProvider::with_reply("hello back")),
//!     tools: Arc::new(ToolRegistry::new()),
//!     strategy: Strategy::chat(),
//!     input_guardrails: vec![],
//!     output_guardrails: vec![],
//!     session: None,
//!     hooks: Arc::new(NoopHooks),
//! };
//!
//! let result = runtime
//!     .run(AgentContext::new("hello"), &CancellationToken::new())
//!     .await
//!     .unwrap();
//! println!("{}", result.output);
//! # }
//! ```

pub mod agent;
pub mod cache;
pub mod error;
pub mod event;
pub mod guardrail;
pub mod inference;
pub mod mcp;
pub mod message;
pub mod orchestration;
pub mod session;
pub mod tool;
pub mod value;

pub use agent::{AgentConfiguration, AgentContext, AgentResult, AgentRuntime, Hooks, NoopHooks};
pub use cache::{Cache, CacheError, InMemoryCache};
pub use error::AgentError;
pub use event::AgentEvent;
pub use guardrail::{Guardrail, GuardrailCheck, GuardrailResult, GuardrailRunner};
pub use inference::{InferenceProvider, InferenceResponse, ToolChoiceMode};
pub use mcp::{McpClient, McpError};
pub use message::Message;
pub use orchestration::{Blueprint, BlueprintError, BlueprintRegistry, Handoff, HandoffSpec, OrchestrationStep};
pub use session::{InMemorySession, Session, SessionError};
pub use tool::{CancellationToken, Tool, ToolCall, ToolError, ToolRegistry, ToolResult};
pub use value::SendableValue;
