//! Session / Memory: opaque conversation store boundary (§3). The CORE ships
//! one in-process reference implementation; durable backends are out of
//! scope and plug in by implementing [`Session`] themselves.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::message::Message;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("storage: {0}")]
    Storage(String),
}

#[async_trait]
pub trait Session: Send + Sync {
    async fn append(&self, message: Message) -> Result<(), SessionError>;
    async fn history(&self) -> Result<Vec<Message>, SessionError>;
}

/// In-process, non-persistent reference [`Session`], grounded in the
/// teacher's `MemorySaver` checkpointer (append-only, lock-guarded `Vec`).
#[derive(Default)]
pub struct InMemorySession {
    messages: Mutex<Vec<Message>>,
}

impl InMemorySession {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Session for InMemorySession {
    async fn append(&self, message: Message) -> Result<(), SessionError> {
        self.messages.lock().await.push(message);
        Ok(())
    }

    async fn history(&self) -> Result<Vec<Message>, SessionError> {
        Ok(self.messages.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn history_returns_messages_in_append_order() {
        let session = InMemorySession::new();
        session.append(Message::user("hi")).await.unwrap();
        session.append(Message::assistant("hello")).await.unwrap();
        let history = session.history().await.unwrap();
        assert_eq!(history, vec![Message::user("hi"), Message::assistant("hello")]);
    }
}
