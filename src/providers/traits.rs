//! Provider trait and message types for model completion backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::sessions::Turn;

/// A single message in a chat-completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// A hosted chat-completion backend.
///
/// The call is logically blocking from the caller's point of view: one ordered
/// message list in, one text reply out. Failures (network, auth, provider-side)
/// surface as errors; the caller decides what to do with them.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Complete a conversation and return the assistant's reply text.
    async fn chat_with_history(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String>;

    /// The canonical name of this provider.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::{Role, Turn};

    #[test]
    fn constructors_set_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
        assert_eq!(ChatMessage::assistant("a").role, "assistant");
    }

    #[test]
    fn turn_converts_to_message() {
        let turn = Turn::new(Role::Assistant, "four");
        let msg = ChatMessage::from(&turn);
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.content, "four");
    }
}
