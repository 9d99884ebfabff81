//! Guardrail runner: input/output/tool validators with tripwire short-circuit,
//! run sequentially or in parallel per [`GuardrailRunnerConfiguration`].

mod runner;

pub use runner::{GuardrailRunner, TrippedGuardrail};

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::value::SendableValue;

/// Outcome of a single guardrail check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardrailResult {
    pub tripwire_triggered: bool,
    pub message: Option<String>,
    pub output_info: Option<SendableValue>,
    pub metadata: BTreeMap<String, SendableValue>,
}

impl GuardrailResult {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn trip(message: impl Into<String>) -> Self {
        Self {
            tripwire_triggered: true,
            message: Some(message.into()),
            output_info: None,
            metadata: BTreeMap::new(),
        }
    }
}

/// Data passed to a guardrail validating a tool call before it executes.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct ToolGuardrailData {
    pub tool_name: String,
    pub arguments: BTreeMap<String, SendableValue>,
}

/// Configuration for [`GuardrailRunner`] (§6.4).
#[derive(Debug, Clone, Copy)]
pub struct GuardrailRunnerConfiguration {
    pub run_in_parallel: bool,
    pub stop_on_first_tripwire: bool,
}

impl Default for GuardrailRunnerConfiguration {
    fn default() -> Self {
        Self {
            run_in_parallel: false,
            stop_on_first_tripwire: true,
        }
    }
}

/// A validator run against agent input, agent output, or tool call data.
#[async_trait]
pub trait GuardrailCheck: Send + Sync {
    fn name(&self) -> &str;
    async fn check_text(&self, _text: &str) -> GuardrailResult {
        GuardrailResult::pass()
    }
    async fn check_tool(&self, _data: &ToolGuardrailData) -> GuardrailResult {
        GuardrailResult::pass()
    }
    async fn check_value(&self, _value: &SendableValue) -> GuardrailResult {
        GuardrailResult::pass()
    }
}

pub type Guardrail = std::sync::Arc<dyn GuardrailCheck>;
