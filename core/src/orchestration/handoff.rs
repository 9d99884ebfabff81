//! Handoff machinery (§4.7): synthesized transfer tools that invoke a target
//! agent, with effective prompt/tool-name resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{AgentContext, AgentRuntime};
use crate::tool::{CancellationToken, ParameterType, Tool, ToolParameter, ToolSchema};
use crate::value::SendableValue;

pub type TextFilter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A handoff declared on an agent: transfers execution to `target` via a
/// synthesized tool call.
pub struct HandoffSpec {
    pub target: Arc<AgentRuntime>,
    pub tool_name: Option<String>,
    pub tool_description: Option<String>,
    pub input_filter: Option<TextFilter>,
    pub instructions_filter: Option<TextFilter>,
}

impl HandoffSpec {
    pub fn new(target: Arc<AgentRuntime>) -> Self {
        Self {
            target,
            tool_name: None,
            tool_description: None,
            input_filter: None,
            instructions_filter: None,
        }
    }

    /// `handoff_to_<snake_case(target.name)>` unless overridden.
    pub fn effective_tool_name(&self) -> String {
        self.tool_name
            .clone()
            .unwrap_or_else(|| format!("handoff_to_{}", to_snake_case(self.target.name())))
    }

    /// `"Hand off execution to <target>"` unless overridden.
    pub fn effective_tool_description(&self) -> String {
        self.tool_description
            .clone()
            .unwrap_or_else(|| format!("Hand off execution to {}", self.target.name()))
    }

    pub fn effective_input(&self, input: &str) -> String {
        match &self.input_filter {
            Some(filter) => filter(input),
            None => input.to_string(),
        }
    }

    pub fn effective_instructions(&self, instructions: &str) -> String {
        match &self.instructions_filter {
            Some(filter) => filter(instructions),
            None => instructions.to_string(),
        }
    }
}

fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, ch) in name.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else if ch == ' ' || ch == '-' {
            out.push('_');
        } else {
            out.push(ch);
        }
    }
    out
}

/// The synthesized tool a parent agent calls to trigger a handoff.
pub struct Handoff {
    name: String,
    from_name: String,
    spec: HandoffSpec,
}

impl Handoff {
    /// `from_name` is the owning agent's name, reported to the target's
    /// `on_handoff(from, to)` hook when this tool is called.
    pub fn new(from_name: impl Into<String>, spec: HandoffSpec) -> Self {
        let name = spec.effective_tool_name();
        Self {
            name,
            from_name: from_name.into(),
            spec,
        }
    }

    pub fn into_tool(self) -> Box<dyn Tool> {
        Box::new(self)
    }
}

#[async_trait]
impl Tool for Handoff {
    fn name(&self) -> &str {
        &self.name
    }

    fn spec(&self) -> ToolSchema {
        ToolSchema {
            name: self.spec.effective_tool_name(),
            description: self.spec.effective_tool_description(),
            parameters: vec![ToolParameter::required(
                "input",
                "the input to hand off to the target agent",
                ParameterType::String,
            )],
        }
    }

    async fn call(&self, args: BTreeMap<String, SendableValue>) -> Result<SendableValue, String> {
        let input = args
            .get("input")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_default();
        let input = self.spec.effective_input(&input);
        self.spec
            .target
            .hooks
            .on_handoff(&self.from_name, self.spec.target.name())
            .await;
        let result = self
            .spec
            .target
            .run(AgentContext::new(input), &CancellationToken::new())
            .await
            .map_err(|e| e.to_string())?;
        Ok(SendableValue::String(result.output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::strategy::Strategy;
    use crate::agent::{AgentConfiguration, Hooks, NoopHooks};
    use crate::inference::mock::MockProvider;
    use crate::tool::ToolRegistry;

    fn target_runtime_with_hooks(name: &str, reply: &str, hooks: Arc<dyn Hooks>) -> Arc<AgentRuntime> {
        Arc::new(AgentRuntime {
            configuration: AgentConfiguration::new(name),
            provider: Arc::new(MockProvider::with_reply(reply)),
            tools: Arc::new(ToolRegistry::new()),
            strategy: Strategy::chat(),
            input_guardrails: vec![],
            output_guardrails: vec![],
            session: None,
            hooks,
        })
    }

    fn target_runtime(name: &str, reply: &str) -> Arc<AgentRuntime> {
        target_runtime_with_hooks(name, reply, Arc::new(NoopHooks))
    }

    #[test]
    fn default_tool_name_is_snake_case_handoff_to_target() {
        let spec = HandoffSpec::new(target_runtime("BillingAgent", "ok"));
        assert_eq!(spec.effective_tool_name(), "handoff_to_billing_agent");
        assert_eq!(spec.effective_tool_description(), "Hand off execution to BillingAgent");
    }

    #[tokio::test]
    async fn calling_the_handoff_tool_invokes_the_target_agent() {
        let spec = HandoffSpec::new(target_runtime("helper", "handled it"));
        let handoff = Handoff::new("parent", spec);
        let args: BTreeMap<String, SendableValue> =
            [("input".to_string(), SendableValue::String("please help".into()))].into_iter().collect();
        let output = handoff.call(args).await.unwrap();
        assert_eq!(output, SendableValue::String("handled it".into()));
    }

    struct SpyHooks {
        seen: std::sync::Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Hooks for SpyHooks {
        async fn on_handoff(&self, from: &str, to: &str) {
            self.seen.lock().unwrap().push((from.to_string(), to.to_string()));
        }
    }

    /// **Scenario**: §4.7 — calling the handoff tool fires the target's
    /// `on_handoff(from, to)` hook exactly once, with the owning agent's name.
    #[tokio::test]
    async fn calling_the_handoff_tool_fires_on_handoff_hook() {
        let spy = Arc::new(SpyHooks {
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let spec = HandoffSpec::new(target_runtime_with_hooks("helper", "handled it", spy.clone()));
        let handoff = Handoff::new("parent", spec);
        let args: BTreeMap<String, SendableValue> =
            [("input".to_string(), SendableValue::String("please help".into()))].into_iter().collect();
        handoff.call(args).await.unwrap();
        assert_eq!(spy.seen.lock().unwrap().as_slice(), &[("parent".to_string(), "helper".to_string())]);
    }
}
