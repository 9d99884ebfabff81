//! Error taxonomy for the agent core.
//!
//! Mirrors the classifier groups of the orchestration runtime: tool failures,
//! guardrail tripwires, inference provider failures, MCP protocol/transport
//! failures, and orchestration/graph construction failures each get their own
//! variant group rather than a single stringly-typed error.

use thiserror::Error;

use crate::guardrail::GuardrailResult;

/// Top-level error returned by agent runs, tool execution, and orchestration.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool '{name}' failed: {message}")]
    ToolExecutionFailed { name: String, message: String },

    #[error("tool '{name}' arguments failed schema coercion: {message}")]
    ToolArgumentsInvalid { name: String, message: String },

    #[error("input guardrail '{name}' tripped: {result:?}")]
    InputGuardrailTripped {
        name: String,
        result: GuardrailResult,
    },

    #[error("output guardrail '{name}' tripped: {result:?}")]
    OutputGuardrailTripped {
        name: String,
        result: GuardrailResult,
    },

    #[error("inference provider failed: {0}")]
    InferenceFailed(String),

    #[error("agent response could not be parsed after {attempts} attempt(s): {message}")]
    InvalidAgentResponse { attempts: u32, message: String },

    #[error("maximum iterations ({0}) reached without a final answer")]
    MaxIterationsReached(u32),

    #[error("run was cancelled")]
    Cancelled,

    #[error("handoff to unknown agent: {0}")]
    UnknownHandoffTarget(String),

    #[error("orchestration blueprint is invalid: {0}")]
    InvalidBlueprint(#[from] crate::orchestration::BlueprintError),

    #[error("mcp error: {0}")]
    Mcp(#[from] crate::mcp::McpError),

    #[error("session error: {0}")]
    Session(String),

    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}
