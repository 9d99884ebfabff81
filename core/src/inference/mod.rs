//! Inference provider contract (§6.2). Abstracts over concrete model
//! backends; the CORE ships no concrete provider, only this trait plus a
//! deterministic mock for tests.

pub mod mock;

use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::message::Message;
use crate::tool::ToolSchema;

/// How the provider should pick whether/which tool to call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ToolChoiceMode {
    #[default]
    Auto,
    None,
    Required,
    Named(String),
}

impl FromStr for ToolChoiceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ToolChoiceMode::Auto),
            "none" => Ok(ToolChoiceMode::None),
            "required" => Ok(ToolChoiceMode::Required),
            other => Ok(ToolChoiceMode::Named(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceOptions {
    pub max_tokens: Option<u32>,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: Option<u32>,
    pub stop_sequences: Vec<String>,
    pub tool_choice: ToolChoiceMode,
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self {
            max_tokens: None,
            temperature: 1.0,
            top_p: 1.0,
            top_k: None,
            stop_sequences: Vec::new(),
            tool_choice: ToolChoiceMode::Auto,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Completed,
    MaxTokens,
    ToolCalls,
    Stop,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone)]
pub struct InferenceResponse {
    pub content: String,
    pub tool_calls: Vec<ParsedToolCall>,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Default)]
pub struct InferenceUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Incremental update emitted by a streaming inference call.
#[derive(Debug, Clone)]
pub enum StreamUpdate {
    ContentDelta(String),
    ToolCallPartial {
        call_id: String,
        name: Option<String>,
        arguments_delta: String,
    },
    ToolCallsCompleted(Vec<ParsedToolCall>),
    Finished(FinishReason),
}

/// Abstract inference backend. The CORE never talks to a concrete model API
/// directly — strategies only ever hold `Arc<dyn InferenceProvider>`.
#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn generate(&self, messages: &[Message], options: &InferenceOptions) -> Result<InferenceResponse, String>;

    async fn generate_with_tool_calls(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &InferenceOptions,
    ) -> Result<InferenceResponse, String> {
        // Default: tools are ignored by providers that don't override this,
        // equivalent to `tool_choice = none`.
        let _ = tools;
        self.generate(messages, options).await
    }

    /// Default streaming behavior: emit the full response as one content
    /// delta followed by `Finished`. Providers with native token streaming
    /// override this.
    async fn stream(
        &self,
        messages: &[Message],
        options: &InferenceOptions,
        sink: tokio::sync::mpsc::Sender<StreamUpdate>,
    ) -> Result<InferenceResponse, String> {
        let response = self.generate(messages, options).await?;
        if !response.content.is_empty() {
            let _ = sink.send(StreamUpdate::ContentDelta(response.content.clone())).await;
        }
        let _ = sink.send(StreamUpdate::Finished(response.finish_reason.clone())).await;
        Ok(response)
    }
}
