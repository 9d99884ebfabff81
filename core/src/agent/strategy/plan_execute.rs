//! Plan-and-execute strategy (§4.5.4, §4.10): plan → steps → replan, bounded
//! by `max_replans` (Open Question 1, resolved in SPEC_FULL §4.10).

use std::sync::Arc;

use super::tool_calling::ToolCallingStrategy;
use super::StrategyOutcome;
use crate::agent::{AgentConfiguration, Hooks};
use crate::error::AgentError;
use crate::inference::{InferenceOptions, InferenceProvider};
use crate::message::Message;
use crate::tool::{CancellationToken, ToolRegistry};

#[derive(Debug, Clone)]
pub struct PlanExecuteConfig {
    pub max_replans: u32,
}

impl Default for PlanExecuteConfig {
    fn default() -> Self {
        Self { max_replans: 2 }
    }
}

pub struct PlanExecuteStrategy {
    config: PlanExecuteConfig,
}

impl PlanExecuteStrategy {
    pub fn new(config: PlanExecuteConfig) -> Self {
        Self { config }
    }

    async fn plan(&self, provider: &dyn InferenceProvider, messages: &[Message]) -> Result<Vec<String>, AgentError> {
        let mut prompt = messages.to_vec();
        prompt.push(Message::system(
            "Break the user's request into an ordered, newline-separated list of sub-goals. Reply with only the list.",
        ));
        let response = provider
            .generate(&prompt, &InferenceOptions::default())
            .await
            .map_err(AgentError::InferenceFailed)?;
        let steps: Vec<String> = response
            .content
            .lines()
            .map(|l| l.trim().trim_start_matches(['-', '*']).trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Ok(steps)
    }

    pub async fn run_loop(
        &self,
        configuration: AgentConfiguration,
        provider: &dyn InferenceProvider,
        tools: &ToolRegistry,
        messages: &mut Vec<Message>,
        hooks: &Arc<dyn Hooks>,
        cancellation: &CancellationToken,
    ) -> Result<StrategyOutcome, AgentError> {
        let mut replans = 0u32;
        let mut completed_goals: Vec<String> = Vec::new();
        let mut all_calls = Vec::new();
        let mut all_results = Vec::new();
        let mut iterations = 0u32;
        let executor = ToolCallingStrategy;

        loop {
            if cancellation.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            let mut planning_context = messages.clone();
            for goal in &completed_goals {
                planning_context.push(Message::system(format!("Already completed: {goal}")));
            }
            let steps = self.plan(provider, &planning_context).await?;

            if steps.is_empty() {
                break;
            }

            let mut replan_needed = false;
            for step in &steps {
                iterations += 1;
                hooks.on_iteration(iterations, &configuration.name).await;
                tracing::debug!(agent = %configuration.name, iteration = iterations, step = %step, "strategy iteration");
                messages.push(Message::user(step.clone()));

                let sub_config = AgentConfiguration {
                    max_iterations: configuration.max_iterations,
                    stop_on_tool_error: false,
                    ..configuration.clone()
                };

                match executor
                    .run_loop(sub_config, provider, tools, messages, hooks, cancellation)
                    .await
                {
                    Ok(outcome) => {
                        all_calls.extend(outcome.tool_calls);
                        all_results.extend(outcome.tool_results);
                        completed_goals.push(step.clone());
                    }
                    Err(AgentError::MaxIterationsReached(_)) | Err(AgentError::ToolExecutionFailed { .. }) => {
                        replan_needed = true;
                        break;
                    }
                    Err(other) => return Err(other),
                }
            }

            if !replan_needed {
                break;
            }

            replans += 1;
            if replans > self.config.max_replans {
                return Err(AgentError::MaxIterationsReached(iterations));
            }
        }

        let output = messages
            .iter()
            .rev()
            .find_map(|m| match m {
                Message::Assistant(text) => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_default();

        Ok(StrategyOutcome {
            output,
            tool_calls: all_calls,
            tool_results: all_results,
            iteration_count: iterations,
            token_usage: None,
        })
    }
}
