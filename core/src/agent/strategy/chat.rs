//! Chat strategy (§4.5.3): a single inference call, no tool loop.

use std::sync::Arc;

use super::StrategyOutcome;
use crate::agent::{AgentConfiguration, Hooks};
use crate::error::AgentError;
use crate::inference::{InferenceOptions, InferenceProvider};
use crate::message::Message;
use crate::tool::{CancellationToken, ToolRegistry};

pub struct ChatStrategy;

impl ChatStrategy {
    pub async fn run_loop(
        &self,
        configuration: AgentConfiguration,
        provider: &dyn InferenceProvider,
        _tools: &ToolRegistry,
        messages: &mut Vec<Message>,
        hooks: &Arc<dyn Hooks>,
        cancellation: &CancellationToken,
    ) -> Result<StrategyOutcome, AgentError> {
        if cancellation.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        hooks.on_iteration(1, "chat").await;
        tracing::debug!(agent = %configuration.name, iteration = 1u32, "strategy iteration");

        let response = provider
            .generate(messages, &InferenceOptions::default())
            .await
            .map_err(AgentError::InferenceFailed)?;

        messages.push(Message::assistant(response.content.clone()));

        Ok(StrategyOutcome {
            output: response.content,
            tool_calls: vec![],
            tool_results: vec![],
            iteration_count: 1,
            token_usage: None,
        })
    }
}
