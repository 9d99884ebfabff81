//! Agent lifecycle core (§4.5): shared pre/post pipeline around a pluggable
//! [`strategy::Strategy`]. Grounded in the teacher's `ReactRunner` (build once,
//! invoke many) and `AgentOptions`/`RunError` shape, generalized from a single
//! ReAct strategy to the four strategies the runtime supports.

pub mod strategy;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::error::AgentError;
use crate::guardrail::{Guardrail, GuardrailRunner};
use crate::inference::{InferenceProvider, InferenceUsage};
use crate::message::Message;
use crate::session::Session;
use crate::tool::{CancellationToken, ToolCall, ToolRegistry, ToolResult};

use strategy::Strategy;

/// Immutable once constructed (§3).
#[derive(Debug, Clone)]
pub struct AgentConfiguration {
    pub name: String,
    pub max_iterations: u32,
    pub stop_on_tool_error: bool,
    pub parallel_tool_execution: bool,
}

impl AgentConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_iterations: 10,
            stop_on_tool_error: false,
            parallel_tool_execution: false,
        }
    }
}

/// Per-run mutable state. Owned by a single run; never shared across runs.
#[derive(Debug, Clone, Default)]
pub struct AgentContext {
    pub input: String,
    pub execution_trail: Vec<String>,
    pub previous_step_output: Option<String>,
    pub shared: BTreeMap<String, String>,
}

impl AgentContext {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            execution_trail: Vec::new(),
            previous_step_output: None,
            shared: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentResult {
    pub output: String,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    pub iteration_count: u32,
    pub duration: Duration,
    pub token_usage: Option<InferenceUsage>,
    pub metadata: BTreeMap<String, String>,
}

/// Lifecycle hooks, fired around a run. Every method is a no-op by default.
#[async_trait]
pub trait Hooks: Send + Sync {
    async fn on_agent_start(&self, _context: &AgentContext) {}
    async fn on_agent_end(&self, _result: &AgentResult) {}
    async fn on_iteration(&self, _n: u32, _agent_name: &str) {}
    async fn on_tool_call_started(&self, _call: &ToolCall) {}
    async fn on_tool_call_completed(&self, _result: &ToolResult) {}
    async fn on_error(&self, _error: &AgentError) {}
    /// Fired whenever execution transfers from one agent to another (§4.7).
    async fn on_handoff(&self, _from: &str, _to: &str) {}
}

pub struct NoopHooks;

#[async_trait]
impl Hooks for NoopHooks {
    async fn on_agent_start(&self, _context: &AgentContext) {}
}

/// A runnable agent: configuration + dependencies + a strategy. This is the
/// one runtime the redesign collapses "deep class hierarchies of agent
/// variants" into (§9) — behavior varies only through `strategy`.
pub struct AgentRuntime {
    pub configuration: AgentConfiguration,
    pub provider: Arc<dyn InferenceProvider>,
    pub tools: Arc<ToolRegistry>,
    pub strategy: Strategy,
    pub input_guardrails: Vec<Guardrail>,
    pub output_guardrails: Vec<Guardrail>,
    pub session: Option<Arc<dyn Session>>,
    pub hooks: Arc<dyn Hooks>,
}

impl AgentRuntime {
    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    /// Runs the 9-step pipeline described in §4.5.
    pub async fn run(
        &self,
        mut context: AgentContext,
        cancellation: &CancellationToken,
    ) -> Result<AgentResult, AgentError> {
        let started_at = Instant::now();
        tracing::info!(agent = %self.configuration.name, "agent run started");

        // 1. Record execution in AgentContext.
        context.execution_trail.push(self.configuration.name.clone());

        // 2. Fire onAgentStart.
        self.hooks.on_agent_start(&context).await;

        // 3. Fetch session history (if any) and feed into memory seed.
        let mut messages = Vec::new();
        if let Some(session) = &self.session {
            messages.extend(
                session
                    .history()
                    .await
                    .map_err(|e| AgentError::Session(e.to_string()))?,
            );
        }
        messages.push(Message::user(context.input.clone()));

        // 4. Run input guardrails; tripwire aborts the run.
        if cancellation.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        if !self.input_guardrails.is_empty() {
            let runner = GuardrailRunner::default();
            if let Some(tripped) = runner.run_input(&self.input_guardrails, &context.input).await {
                let err = AgentError::InputGuardrailTripped {
                    name: tripped.triggering_guardrail,
                    result: tripped.result,
                };
                tracing::error!(agent = %self.configuration.name, error = %err, "agent run failed");
                self.hooks.on_error(&err).await;
                return Err(err);
            }
        }

        // 5. Delegate to the strategy's runLoop.
        let outcome = self
            .strategy
            .run_loop(
                self.configuration.clone(),
                self.provider.as_ref(),
                self.tools.as_ref(),
                &mut messages,
                &self.hooks,
                cancellation,
            )
            .await;

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(agent = %self.configuration.name, error = %err, "agent run failed");
                self.hooks.on_error(&err).await;
                return Err(err);
            }
        };

        // 6. Run output guardrails on the final text.
        if !self.output_guardrails.is_empty() {
            let runner = GuardrailRunner::default();
            if let Some(tripped) = runner.run_output(&self.output_guardrails, &outcome.output).await {
                let err = AgentError::OutputGuardrailTripped {
                    name: tripped.triggering_guardrail,
                    result: tripped.result,
                };
                tracing::error!(agent = %self.configuration.name, error = %err, "agent run failed");
                self.hooks.on_error(&err).await;
                return Err(err);
            }
        }

        // 7. Writeback: append user message + assistant message to session.
        if let Some(session) = &self.session {
            session
                .append(Message::user(context.input.clone()))
                .await
                .map_err(|e| AgentError::Session(e.to_string()))?;
            session
                .append(Message::assistant(outcome.output.clone()))
                .await
                .map_err(|e| AgentError::Session(e.to_string()))?;
        }

        let result = AgentResult {
            output: outcome.output,
            tool_calls: outcome.tool_calls,
            tool_results: outcome.tool_results,
            iteration_count: outcome.iteration_count,
            duration: started_at.elapsed(),
            token_usage: outcome.token_usage,
            metadata: BTreeMap::new(),
        };

        tracing::info!(
            agent = %self.configuration.name,
            iterations = result.iteration_count,
            duration_ms = result.duration.as_millis() as u64,
            "agent run completed"
        );

        // 8. Fire onAgentEnd.
        self.hooks.on_agent_end(&result).await;

        // 9. Return AgentResult.
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::mock::MockProvider;
    use crate::tool::ToolRegistry;

    #[tokio::test]
    async fn chat_strategy_run_returns_single_shot_output() {
        let runtime = AgentRuntime {
            configuration: AgentConfiguration::new("chat-agent"),
            provider: Arc::new(MockProvider::with_reply("hello there")),
            tools: Arc::new(ToolRegistry::new()),
            strategy: Strategy::chat(),
            input_guardrails: vec![],
            output_guardrails: vec![],
            session: None,
            hooks: Arc::new(NoopHooks),
        };
        let result = runtime
            .run(AgentContext::new("hi"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.output, "hello there");
        assert_eq!(result.iteration_count, 1);
    }

    #[tokio::test]
    async fn input_guardrail_tripwire_aborts_before_strategy_runs() {
        use crate::guardrail::{GuardrailCheck, GuardrailResult};
        use async_trait::async_trait;

        struct AlwaysTrip;
        #[async_trait]
        impl GuardrailCheck for AlwaysTrip {
            fn name(&self) -> &str {
                "always-trip"
            }
            async fn check_text(&self, _text: &str) -> GuardrailResult {
                GuardrailResult::trip("blocked")
            }
        }

        let runtime = AgentRuntime {
            configuration: AgentConfiguration::new("guarded"),
            provider: Arc::new(MockProvider::with_reply("should not run")),
            tools: Arc::new(ToolRegistry::new()),
            strategy: Strategy::chat(),
            input_guardrails: vec![Arc::new(AlwaysTrip)],
            output_guardrails: vec![],
            session: None,
            hooks: Arc::new(NoopHooks),
        };
        let err = runtime
            .run(AgentContext::new("hi"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InputGuardrailTripped { .. }));
    }
}
