//! Strategy engines (§4.5.1-4.5.4): tool-calling, ReAct, chat, plan-and-execute.
//! Each strategy owns its own iteration discipline; the lifecycle core only
//! knows `run_loop`. This is the "narrow interface" the redesign notes call
//! for in place of deep agent-variant class hierarchies (§9).

mod chat;
mod plan_execute;
mod react;
mod tool_calling;

pub use chat::ChatStrategy;
pub use plan_execute::{PlanExecuteConfig, PlanExecuteStrategy};
pub use react::{ReactStrategy, ReactStrategyConfig};
pub use tool_calling::ToolCallingStrategy;

use std::sync::Arc;

use crate::agent::{AgentConfiguration, Hooks};
use crate::error::AgentError;
use crate::inference::{InferenceProvider, InferenceUsage};
use crate::message::Message;
use crate::tool::{CancellationToken, ToolCall, ToolRegistry, ToolResult};

#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub output: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub iteration_count: u32,
    pub token_usage: Option<InferenceUsage>,
}

/// Dispatches to one of the four concrete strategy engines. A plain enum
/// rather than a trait object: the set of strategies is closed and known at
/// compile time, and callers rarely need to add a fifth dynamically.
pub enum Strategy {
    ToolCalling(ToolCallingStrategy),
    React(ReactStrategy),
    Chat(ChatStrategy),
    PlanExecute(PlanExecuteStrategy),
}

impl Strategy {
    pub fn tool_calling() -> Self {
        Strategy::ToolCalling(ToolCallingStrategy)
    }

    pub fn react(config: ReactStrategyConfig) -> Self {
        Strategy::React(ReactStrategy::new(config))
    }

    pub fn chat() -> Self {
        Strategy::Chat(ChatStrategy)
    }

    pub fn plan_execute(config: PlanExecuteConfig) -> Self {
        Strategy::PlanExecute(PlanExecuteStrategy::new(config))
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn run_loop(
        &self,
        configuration: AgentConfiguration,
        provider: &dyn InferenceProvider,
        tools: &ToolRegistry,
        messages: &mut Vec<Message>,
        hooks: &Arc<dyn Hooks>,
        cancellation: &CancellationToken,
    ) -> Result<StrategyOutcome, AgentError> {
        match self {
            Strategy::ToolCalling(s) => s.run_loop(configuration, provider, tools, messages, hooks, cancellation).await,
            Strategy::React(s) => s.run_loop(configuration, provider, tools, messages, hooks, cancellation).await,
            Strategy::Chat(s) => s.run_loop(configuration, provider, tools, messages, hooks, cancellation).await,
            Strategy::PlanExecute(s) => s.run_loop(configuration, provider, tools, messages, hooks, cancellation).await,
        }
    }
}
