//! Tool abstraction, registry, and execution engine (§4.1-4.3).
//!
//! A [`Tool`] is a type-erased, named, schema-described async function.
//! [`ToolRegistry`] owns a set of tools and runs the `execute` protocol:
//! cancellation check, lookup, argument normalization, input guardrails,
//! invocation, output guardrails.

pub mod parallel;
pub mod registry;
pub mod schema;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use parallel::{run_parallel, ErrorStrategy};
pub use registry::ToolRegistry;
pub use schema::{normalize, ParameterType, SchemaError, ToolParameter, ToolSchema};

use crate::guardrail::{Guardrail, GuardrailRunner, ToolGuardrailData};
use crate::value::SendableValue;

/// A request to invoke a tool, created exclusively by the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: Uuid,
    pub provider_call_id: Option<String>,
    pub tool_name: String,
    pub arguments: BTreeMap<String, SendableValue>,
}

/// Outcome of executing a [`ToolCall`]. At most one per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: Uuid,
    pub success: bool,
    pub output: Option<SendableValue>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl ToolResult {
    pub fn ok(call_id: Uuid, output: SendableValue, duration: Duration) -> Self {
        Self {
            call_id,
            success: true,
            output: Some(output),
            error: None,
            duration,
        }
    }

    pub fn failed(call_id: Uuid, error: impl Into<String>, duration: Duration) -> Self {
        Self {
            call_id,
            success: false,
            output: None,
            error: Some(error.into()),
            duration,
        }
    }
}

/// Error produced by tool lookup, coercion, guardrails, or execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("cancelled")]
    Cancelled,
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments for '{tool_name}': {reason}")]
    InvalidArguments { tool_name: String, reason: String },
    #[error("input guardrail '{guardrail_name}' tripped for tool '{tool_name}': {message}")]
    InputTripwire {
        guardrail_name: String,
        tool_name: String,
        message: String,
    },
    #[error("output guardrail '{guardrail_name}' tripped for tool '{tool_name}': {message}")]
    OutputTripwire {
        guardrail_name: String,
        tool_name: String,
        message: String,
    },
    #[error("tool '{tool_name}' failed: {underlying}")]
    ExecutionFailed { tool_name: String, underlying: String },
}

/// A named, schema-described, async function invocable by an agent.
///
/// ```
/// use async_trait::async_trait;
/// use weave::tool::{Tool, ToolSchema};
/// use weave::value::SendableValue;
/// use std::collections::BTreeMap;
///
/// struct Echo;
///
/// #[async_trait]
/// impl Tool for Echo {
///     fn name(&self) -> &str { "echo" }
///     fn spec(&self) -> ToolSchema {
///         ToolSchema { name: "echo".into(), description: "echoes input".into(), parameters: vec![] }
///     }
///     async fn call(&self, args: BTreeMap<String, SendableValue>) -> Result<SendableValue, String> {
///         Ok(SendableValue::Dict(args))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn spec(&self) -> ToolSchema;

    /// Guardrails run against `{tool, arguments}` before `call`.
    fn input_guardrails(&self) -> Vec<Guardrail> {
        Vec::new()
    }

    /// Guardrails run against the produced output before it is returned.
    fn output_guardrails(&self) -> Vec<Guardrail> {
        Vec::new()
    }

    async fn call(&self, args: BTreeMap<String, SendableValue>) -> Result<SendableValue, String>;
}

/// Cancellation token checked at every suspension point (§5).
#[derive(Clone, Default)]
pub struct CancellationToken(std::sync::Arc<std::sync::atomic::AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(std::sync::atomic::Ordering::SeqCst)
    }
}

/// Runs the 7-step `execute` protocol (§4.2) against a single registered tool.
pub async fn execute(
    registry: &ToolRegistry,
    name: &str,
    arguments: BTreeMap<String, SendableValue>,
    cancellation: &CancellationToken,
) -> Result<SendableValue, ToolError> {
    let started_at = std::time::Instant::now();
    if cancellation.is_cancelled() {
        return Err(ToolError::Cancelled);
    }

    let tool = registry.get(name).ok_or_else(|| ToolError::NotFound(name.to_string()))?;

    let normalized = normalize(&tool.spec().parameters, &arguments).map_err(|e| ToolError::InvalidArguments {
        tool_name: name.to_string(),
        reason: e.to_string(),
    })?;

    let input_guardrails = tool.input_guardrails();
    if !input_guardrails.is_empty() {
        let data = ToolGuardrailData {
            tool_name: name.to_string(),
            arguments: normalized.clone(),
        };
        let runner = GuardrailRunner::default();
        if let Some(result) = runner.run_tool_input(&input_guardrails, &data).await {
            return Err(ToolError::InputTripwire {
                guardrail_name: result.triggering_guardrail,
                tool_name: name.to_string(),
                message: result.result.message.unwrap_or_default(),
            });
        }
    }

    let output = tool
        .call(normalized)
        .await
        .map_err(|underlying| ToolError::ExecutionFailed {
            tool_name: name.to_string(),
            underlying,
        })?;

    let output_guardrails = tool.output_guardrails();
    if !output_guardrails.is_empty() {
        let runner = GuardrailRunner::default();
        if let Some(result) = runner.run_tool_output(&output_guardrails, &output).await {
            return Err(ToolError::OutputTripwire {
                guardrail_name: result.triggering_guardrail,
                tool_name: name.to_string(),
                message: result.result.message.unwrap_or_default(),
            });
        }
    }

    tracing::info!(
        tool = name,
        duration_ms = started_at.elapsed().as_millis() as u64,
        success = true,
        "tool call completed"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AddTool;

    #[async_trait]
    impl Tool for AddTool {
        fn name(&self) -> &str {
            "add"
        }
        fn spec(&self) -> ToolSchema {
            ToolSchema {
                name: "add".into(),
                description: "adds two ints".into(),
                parameters: vec![
                    ToolParameter::required("x", "", ParameterType::Int),
                    ToolParameter::required("y", "", ParameterType::Int),
                ],
            }
        }
        async fn call(&self, args: BTreeMap<String, SendableValue>) -> Result<SendableValue, String> {
            let x = args.get("x").and_then(|v| v.as_int()).unwrap_or(0);
            let y = args.get("y").and_then(|v| v.as_int()).unwrap_or(0);
            Ok(SendableValue::Int(x + y))
        }
    }

    /// **Scenario**: S1 — loosely-typed args coerce before `add` executes.
    #[tokio::test]
    async fn execute_coerces_arguments_before_calling_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Box::new(AddTool));
        let args: BTreeMap<String, SendableValue> = [
            ("x".to_string(), SendableValue::String("2".into())),
            ("y".to_string(), SendableValue::Double(3.0)),
        ]
        .into_iter()
        .collect();
        let result = execute(&registry, "add", args, &CancellationToken::new()).await.unwrap();
        assert_eq!(result, SendableValue::Int(5));
    }

    #[tokio::test]
    async fn execute_fails_fast_when_cancelled() {
        let registry = ToolRegistry::new();
        let token = CancellationToken::new();
        token.cancel();
        let err = execute(&registry, "add", BTreeMap::new(), &token).await.unwrap_err();
        assert!(matches!(err, ToolError::Cancelled));
    }

    #[tokio::test]
    async fn execute_reports_not_found_for_unregistered_tool() {
        let registry = ToolRegistry::new();
        let err = execute(&registry, "missing", BTreeMap::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::NotFound(name) if name == "missing"));
    }
}
