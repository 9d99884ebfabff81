//! Conversation message type shared by strategies, sessions, and the inference
//! provider contract.

use serde::{Deserialize, Serialize};

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System(String),
    User(String),
    Assistant(String),
    /// Result of a tool call fed back to the model, keyed by call id.
    Tool { call_id: String, content: String },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User(content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant(content.into())
    }

    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            call_id: call_id.into(),
            content: content.into(),
        }
    }

    /// Text content regardless of role, for logging/transcript purposes.
    pub fn content(&self) -> &str {
        match self {
            Message::System(s) | Message::User(s) | Message::Assistant(s) => s,
            Message::Tool { content, .. } => content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_build_expected_variants() {
        assert_eq!(Message::system("s"), Message::System("s".into()));
        assert_eq!(Message::user("u"), Message::User("u".into()));
        assert_eq!(Message::assistant("a"), Message::Assistant("a".into()));
        assert_eq!(
            Message::tool("c1", "r"),
            Message::Tool {
                call_id: "c1".into(),
                content: "r".into()
            }
        );
    }

    #[test]
    fn roundtrips_through_json() {
        let msg = Message::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, back);
    }

    #[test]
    fn content_extracts_text_for_every_variant() {
        assert_eq!(Message::system("s").content(), "s");
        assert_eq!(Message::tool("c", "r").content(), "r");
    }
}
