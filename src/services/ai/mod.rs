pub mod client;
pub mod entities;
#[cfg(test)]
pub(crate) mod fake;
pub mod intent;
pub mod ollama;
pub mod openai;
pub mod response;
pub mod transfer;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::ConversationTurn;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
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

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Raw chat-completion transport for a specific vendor.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, messages: &[Message], options: ChatOptions) -> anyhow::Result<String>;
}

/// The three language-model capabilities the receptionist relies on.
///
/// Every call may fail; callers fall back immediately and never retry, so a
/// live caller is never left waiting on a second round trip.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Returns a bare intent label for an utterance the keyword pass missed.
    async fn classify_freeform(&self, text: &str) -> anyhow::Result<String>;

    /// Produces the next receptionist utterance for a prepared message list.
    async fn generate_text(&self, messages: &[Message]) -> anyhow::Result<String>;

    /// Condenses a finished call for the call log.
    async fn summarize(&self, turns: &[ConversationTurn]) -> anyhow::Result<String>;
}
