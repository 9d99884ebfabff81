//! Bridges agent run events into `weave_events::ProtocolEvent` (§6.3). The
//! core crate owns the agent-shaped types; `weave-events` owns the wire
//! shape, mirroring the teacher's loom/stream-event split.

use async_trait::async_trait;
use weave_events::ProtocolEvent;

use crate::agent::{AgentContext, AgentResult, Hooks};
use crate::error::AgentError;
use crate::guardrail::GuardrailResult;
use crate::tool::{ToolCall, ToolResult};

#[derive(Debug, Clone)]
pub enum AgentEvent {
    Started { input: String },
    Iteration { n: u32, agent_name: String },
    ToolCallStarted(ToolCall),
    ToolCallCompleted(ToolResult),
    Handoff { from: String, to: String },
    GuardrailTriggered {
        name: String,
        classifier: String,
        result: GuardrailResult,
    },
    GenerationDelta(String),
    Completed(AgentResult),
    Failed(String),
}

impl AgentEvent {
    pub fn started(context: &AgentContext) -> Self {
        AgentEvent::Started {
            input: context.input.clone(),
        }
    }

    pub fn failed(error: &AgentError) -> Self {
        AgentEvent::Failed(error.to_string())
    }

    /// Converts to the wire-level event, serializing any structured payload
    /// through `serde_json`.
    pub fn to_protocol_event(&self) -> ProtocolEvent {
        match self {
            AgentEvent::Started { input } => ProtocolEvent::Started { input: input.clone() },
            AgentEvent::Iteration { n, agent_name } => ProtocolEvent::Iteration {
                n: *n,
                agent_name: agent_name.clone(),
            },
            AgentEvent::ToolCallStarted(call) => ProtocolEvent::ToolCallStarted {
                call: serde_json::to_value(call).unwrap_or_default(),
            },
            AgentEvent::ToolCallCompleted(result) => ProtocolEvent::ToolCallCompleted {
                result: serde_json::to_value(result).unwrap_or_default(),
            },
            AgentEvent::Handoff { from, to } => ProtocolEvent::Handoff {
                from: from.clone(),
                to: to.clone(),
            },
            AgentEvent::GuardrailTriggered { name, classifier, result } => ProtocolEvent::GuardrailTriggered {
                name: name.clone(),
                classifier: classifier.clone(),
                result: serde_json::to_value(result).unwrap_or_default(),
            },
            AgentEvent::GenerationDelta(text) => ProtocolEvent::GenerationDelta { text: text.clone() },
            AgentEvent::Completed(result) => ProtocolEvent::Completed {
                result: serde_json::json!({
                    "output": result.output,
                    "iterationCount": result.iteration_count,
                }),
            },
            AgentEvent::Failed(message) => ProtocolEvent::Failed { error: message.clone() },
        }
    }
}

/// Bridges [`Hooks`] callbacks onto an `AgentEvent` channel, the way the
/// teacher's streaming impl bridges `StreamUpdate`s onto an mpsc sender.
/// A dropped receiver just means nobody's listening — sends are best-effort.
pub struct EventHooks {
    sender: tokio::sync::mpsc::Sender<AgentEvent>,
}

impl EventHooks {
    pub fn new(sender: tokio::sync::mpsc::Sender<AgentEvent>) -> Self {
        Self { sender }
    }

    async fn emit(&self, event: AgentEvent) {
        let _ = self.sender.send(event).await;
    }
}

#[async_trait]
impl Hooks for EventHooks {
    async fn on_agent_start(&self, context: &AgentContext) {
        self.emit(AgentEvent::started(context)).await;
    }

    async fn on_agent_end(&self, result: &AgentResult) {
        self.emit(AgentEvent::Completed(result.clone())).await;
    }

    async fn on_iteration(&self, n: u32, agent_name: &str) {
        self.emit(AgentEvent::Iteration {
            n,
            agent_name: agent_name.to_string(),
        })
        .await;
    }

    async fn on_tool_call_started(&self, call: &ToolCall) {
        self.emit(AgentEvent::ToolCallStarted(call.clone())).await;
    }

    async fn on_tool_call_completed(&self, result: &ToolResult) {
        self.emit(AgentEvent::ToolCallCompleted(result.clone())).await;
    }

    async fn on_error(&self, error: &AgentError) {
        self.emit(AgentEvent::failed(error)).await;
    }

    async fn on_handoff(&self, from: &str, to: &str) {
        self.emit(AgentEvent::Handoff {
            from: from.to_string(),
            to: to.to_string(),
        })
        .await;
    }
}
