//! Protocol-level event types: wire shape for one stream event (type +
//! payload). Envelope (session_id, node_id, event_id) is applied separately
//! by [`crate::envelope`].

use serde::Serialize;
use serde_json::Value;

/// One observable event in an agent run's stream (§6.3). State-carrying
/// variants use `serde_json::Value`; the core crate serializes its own types
/// into that before handing events to this crate, which has no dependency on
/// the core crate.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    Started { input: String },
    Iteration { n: u32, agent_name: String },
    ToolCallStarted { call: Value },
    ToolCallCompleted { result: Value },
    Handoff { from: String, to: String },
    GuardrailTriggered {
        name: String,
        classifier: String,
        result: Value,
    },
    GenerationDelta { text: String },
    Completed { result: Value },
    Failed { error: String },
    Checkpoint {
        checkpoint_id: String,
        timestamp: String,
        step: i64,
        state: Value,
        thread_id: Option<String>,
        checkpoint_ns: Option<String>,
    },
    Custom { value: Value },
}

impl ProtocolEvent {
    /// Serializes this event to a JSON object (type + payload only; no envelope).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
