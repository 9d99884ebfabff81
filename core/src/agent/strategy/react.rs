//! ReAct strategy (§4.5.2, §4.11): text-parse loop over a
//! Thought/Action/Action Input/Final Answer transcript format, grounded in the
//! teacher's `ReactRunner` think→act→observe loop but driven by parsing the
//! model's text rather than native tool-call fields.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::StrategyOutcome;
use crate::agent::{AgentConfiguration, Hooks};
use crate::error::AgentError;
use crate::inference::{InferenceOptions, InferenceProvider};
use crate::message::Message;
use crate::tool::{self, CancellationToken, ToolCall, ToolRegistry, ToolResult};
use crate::value::SendableValue;

/// K = 2 consecutive parse failures before surfacing `InvalidAgentResponse`
/// (Open Question 2, resolved in SPEC_FULL §4.11).
#[derive(Debug, Clone)]
pub struct ReactStrategyConfig {
    pub max_parse_failures: u32,
}

impl Default for ReactStrategyConfig {
    fn default() -> Self {
        Self { max_parse_failures: 2 }
    }
}

pub struct ReactStrategy {
    config: ReactStrategyConfig,
}

impl ReactStrategy {
    pub fn new(config: ReactStrategyConfig) -> Self {
        Self { config }
    }
}

enum ParsedStep {
    Action { tool_name: String, arguments: String },
    FinalAnswer(String),
}

fn parse_step(text: &str) -> Option<ParsedStep> {
    if let Some(idx) = text.find("Final Answer:") {
        return Some(ParsedStep::FinalAnswer(text[idx + "Final Answer:".len()..].trim().to_string()));
    }
    let action_idx = text.find("Action:")?;
    let input_idx = text.find("Action Input:")?;
    if input_idx <= action_idx {
        return None;
    }
    let tool_name = text[action_idx + "Action:".len()..input_idx].trim().to_string();
    let rest = &text[input_idx + "Action Input:".len()..];
    let arguments = rest.lines().next().unwrap_or("").trim().to_string();
    if tool_name.is_empty() || arguments.is_empty() {
        return None;
    }
    Some(ParsedStep::Action { tool_name, arguments })
}

fn parse_arguments(raw: &str) -> BTreeMap<String, SendableValue> {
    serde_json::from_str::<serde_json::Value>(raw)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .map(|obj| obj.into_iter().map(|(k, v)| (k, SendableValue::from(v))).collect())
        .unwrap_or_default()
}

impl ReactStrategy {
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
        let mut consecutive_parse_failures = 0u32;

        for iteration in 1..=configuration.max_iterations {
            if cancellation.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            hooks.on_iteration(iteration, &configuration.name).await;
            tracing::debug!(agent = %configuration.name, iteration, "strategy iteration");

            let response = provider
                .generate(messages, &InferenceOptions::default())
                .await
                .map_err(AgentError::InferenceFailed)?;

            let Some(step) = parse_step(&response.content) else {
                consecutive_parse_failures += 1;
                if consecutive_parse_failures >= self.config.max_parse_failures {
                    return Err(AgentError::InvalidAgentResponse {
                        attempts: consecutive_parse_failures,
                        message: response.content,
                    });
                }
                messages.push(Message::assistant(response.content));
                messages.push(Message::user(
                    "Could not parse a response. Reply with either 'Action: <tool>\\nAction Input: <json>' or 'Final Answer: <text>'.",
                ));
                continue;
            };
            consecutive_parse_failures = 0;

            match step {
                ParsedStep::FinalAnswer(text) => {
                    messages.push(Message::assistant(text.clone()));
                    return Ok(StrategyOutcome {
                        output: text,
                        tool_calls: all_calls,
                        tool_results: all_results,
                        iteration_count: iteration,
                        token_usage: None,
                    });
                }
                ParsedStep::Action { tool_name, arguments } => {
                    let call = ToolCall {
                        id: Uuid::new_v4(),
                        provider_call_id: None,
                        tool_name: tool_name.clone(),
                        arguments: parse_arguments(&arguments),
                    };
                    hooks.on_tool_call_started(&call).await;
                    let started = Instant::now();
                    let result = match tool::execute(tools, &call.tool_name, call.arguments.clone(), cancellation).await
                    {
                        Ok(value) => ToolResult::ok(call.id, value, started.elapsed()),
                        Err(e) => ToolResult::failed(call.id, e.to_string(), started.elapsed()),
                    };
                    hooks.on_tool_call_completed(&result).await;

                    if !result.success && configuration.stop_on_tool_error {
                        return Err(AgentError::ToolExecutionFailed {
                            name: tool_name,
                            message: result.error.unwrap_or_default(),
                        });
                    }

                    let observation = match (&result.output, &result.error) {
                        (Some(output), _) => serde_json::to_string(output).unwrap_or_default(),
                        (None, Some(err)) => err.clone(),
                        (None, None) => String::new(),
                    };
                    messages.push(Message::assistant(response.content));
                    messages.push(Message::user(format!("Observation: {observation}")));

                    all_calls.push(call);
                    all_results.push(result);
                }
            }
        }

        Err(AgentError::MaxIterationsReached(configuration.max_iterations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::NoopHooks;
    use crate::inference::mock::MockProvider;
    use crate::inference::{FinishReason, InferenceResponse};
    use crate::tool::ToolRegistry;

    #[tokio::test]
    async fn final_answer_ends_the_loop() {
        let provider = MockProvider::with_reply("Final Answer: done");
        let tools = ToolRegistry::new();
        let mut messages = vec![Message::user("go")];
        let outcome = ReactStrategy::new(ReactStrategyConfig::default())
            .run_loop(
                AgentConfiguration::new("react"),
                &provider,
                &tools,
                &mut messages,
                &(Arc::new(NoopHooks) as Arc<dyn Hooks>),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.output, "done");
        assert_eq!(outcome.iteration_count, 1);
    }

    /// **Scenario**: two consecutive unparseable replies trip `InvalidAgentResponse` at K=2.
    #[tokio::test]
    async fn two_consecutive_unparseable_replies_trip_invalid_agent_response() {
        let provider = MockProvider::with_script(vec![
            InferenceResponse {
                content: "not following the format".into(),
                tool_calls: vec![],
                finish_reason: FinishReason::Completed,
            },
            InferenceResponse {
                content: "still not following it".into(),
                tool_calls: vec![],
                finish_reason: FinishReason::Completed,
            },
        ]);
        let tools = ToolRegistry::new();
        let mut messages = vec![Message::user("go")];
        let err = ReactStrategy::new(ReactStrategyConfig::default())
            .run_loop(
                AgentConfiguration::new("react"),
                &provider,
                &tools,
                &mut messages,
                &(Arc::new(NoopHooks) as Arc<dyn Hooks>),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidAgentResponse { attempts: 2, .. }));
    }
}
