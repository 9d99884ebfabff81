//! Deterministic mock inference provider for tests (never shipped as a real
//! backend — concrete providers are explicitly out of scope for the CORE).

use std::sync::Mutex;

use async_trait::async_trait;

use super::{FinishReason, InferenceOptions, InferenceProvider, InferenceResponse, ParsedToolCall};
use crate::message::Message;
use crate::tool::ToolSchema;

/// Replays a fixed script of responses, one per call to `generate`/
/// `generate_with_tool_calls`, cycling the last entry once exhausted.
pub struct MockProvider {
    script: Mutex<Vec<InferenceResponse>>,
    cursor: Mutex<usize>,
}

impl MockProvider {
    pub fn with_reply(content: impl Into<String>) -> Self {
        Self::with_script(vec![InferenceResponse {
            content: content.into(),
            tool_calls: vec![],
            finish_reason: FinishReason::Completed,
        }])
    }

    pub fn with_script(script: Vec<InferenceResponse>) -> Self {
        Self {
            script: Mutex::new(script),
            cursor: Mutex::new(0),
        }
    }

    /// Convenience for scripting a tool-call turn followed by a final-answer turn.
    pub fn tool_call_then_answer(tool_name: &str, arguments: &str, final_answer: &str) -> Self {
        Self::with_script(vec![
            InferenceResponse {
                content: String::new(),
                tool_calls: vec![ParsedToolCall {
                    call_id: "call-1".into(),
                    name: tool_name.into(),
                    arguments: arguments.into(),
                }],
                finish_reason: FinishReason::ToolCalls,
            },
            InferenceResponse {
                content: final_answer.into(),
                tool_calls: vec![],
                finish_reason: FinishReason::Completed,
            },
        ])
    }

    fn next_response(&self) -> InferenceResponse {
        let script = self.script.lock().unwrap();
        let mut cursor = self.cursor.lock().unwrap();
        let idx = (*cursor).min(script.len() - 1);
        *cursor += 1;
        script[idx].clone()
    }
}

impl Clone for InferenceResponse {
    fn clone(&self) -> Self {
        Self {
            content: self.content.clone(),
            tool_calls: self.tool_calls.clone(),
            finish_reason: self.finish_reason.clone(),
        }
    }
}

#[async_trait]
impl InferenceProvider for MockProvider {
    async fn generate(&self, _messages: &[Message], _options: &InferenceOptions) -> Result<InferenceResponse, String> {
        Ok(self.next_response())
    }

    async fn generate_with_tool_calls(
        &self,
        _messages: &[Message],
        _tools: &[ToolSchema],
        _options: &InferenceOptions,
    ) -> Result<InferenceResponse, String> {
        Ok(self.next_response())
    }
}
