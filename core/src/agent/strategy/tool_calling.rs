//! Tool-calling strategy (§4.5.1): the native function-call loop. The
//! provider reports structured tool calls directly; no text parsing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::StrategyOutcome;
use crate::agent::{AgentConfiguration, Hooks};
use crate::error::AgentError;
use crate::inference::{FinishReason, InferenceOptions, InferenceProvider};
use crate::message::Message;
use crate::tool::{self, CancellationToken, ErrorStrategy, ToolCall, ToolRegistry, ToolResult};
use crate::value::SendableValue;

pub struct ToolCallingStrategy;

impl ToolCallingStrategy {
    pub async fn run_loop(
        &self,
        configuration: AgentConfiguration,
        provider: &dyn InferenceProvider,
        tools: &ToolRegistry,
        messages: &mut Vec<Message>,
        hooks: &Arc<dyn Hooks>,
        cancellation: &CancellationToken,
    ) -> Result<StrategyOutcome, AgentError> {
        let mut all_calls = Vec::new();
        let mut all_results = Vec::new();
        let schemas = tools.list();

        for iteration in 1..=configuration.max_iterations {
            if cancellation.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            hooks.on_iteration(iteration, &configuration.name).await;
            tracing::debug!(agent = %configuration.name, iteration, "strategy iteration");

            let response = provider
                .generate_with_tool_calls(messages, &schemas, &InferenceOptions::default())
                .await
                .map_err(AgentError::InferenceFailed)?;

            if response.tool_calls.is_empty() {
                messages.push(Message::assistant(response.content.clone()));
                return Ok(StrategyOutcome {
                    output: response.content,
                    tool_calls: all_calls,
                    tool_results: all_results,
                    iteration_count: iteration,
                    token_usage: None,
                });
            }

            let calls: Vec<ToolCall> = response
                .tool_calls
                .iter()
                .map(|parsed| ToolCall {
                    id: Uuid::new_v4(),
                    provider_call_id: Some(parsed.call_id.clone()),
                    tool_name: parsed.name.clone(),
                    arguments: parse_arguments(&parsed.arguments),
                })
                .collect();

            let results = if configuration.parallel_tool_execution {
                let outcomes = tool::run_parallel(tools, &calls, ErrorStrategy::CollectErrors, cancellation)
                    .await
                    .map_err(|e| AgentError::ToolExecutionFailed {
                        name: "parallel".into(),
                        message: e.to_string(),
                    })?;
                let started = Instant::now();
                calls
                    .iter()
                    .zip(outcomes)
                    .map(|(call, outcome)| match outcome {
                        Some(Ok(value)) => ToolResult::ok(call.id, value, started.elapsed()),
                        Some(Err(e)) => ToolResult::failed(call.id, e.to_string(), started.elapsed()),
                        None => ToolResult::failed(call.id, "tool execution dropped", started.elapsed()),
                    })
                    .collect::<Vec<_>>()
            } else {
                let mut results = Vec::with_capacity(calls.len());
                for call in &calls {
                    hooks.on_tool_call_started(call).await;
                    let started = Instant::now();
                    let result = match tool::execute(tools, &call.tool_name, call.arguments.clone(), cancellation).await
                    {
                        Ok(value) => ToolResult::ok(call.id, value, started.elapsed()),
                        Err(e) => ToolResult::failed(call.id, e.to_string(), started.elapsed()),
                    };
                    hooks.on_tool_call_completed(&result).await;
                    if !result.success && configuration.stop_on_tool_error {
                        return Err(AgentError::ToolExecutionFailed {
                            name: call.tool_name.clone(),
                            message: result.error.clone().unwrap_or_default(),
                        });
                    }
                    results.push(result);
                }
                results
            };

            for (call, result) in calls.iter().zip(results.iter()) {
                let content = match (&result.output, &result.error) {
                    (Some(output), _) => serde_json::to_string(output).unwrap_or_default(),
                    (None, Some(err)) => err.clone(),
                    (None, None) => String::new(),
                };
                messages.push(Message::tool(
                    call.provider_call_id.clone().unwrap_or_else(|| call.id.to_string()),
                    content,
                ));
            }

            all_calls.extend(calls);
            all_results.extend(results);

            if configuration.stop_on_tool_error && all_results.iter().any(|r| !r.success) {
                let failed = all_results.iter().find(|r| !r.success).unwrap();
                return Err(AgentError::ToolExecutionFailed {
                    name: "tool".into(),
                    message: failed.error.clone().unwrap_or_default(),
                });
            }
        }

        Err(AgentError::MaxIterationsReached(configuration.max_iterations))
    }
}

fn parse_arguments(raw: &str) -> BTreeMap<String, SendableValue> {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .map(|obj| obj.into_iter().map(|(k, v)| (k, SendableValue::from(v))).collect())
        .unwrap_or_default()
}
