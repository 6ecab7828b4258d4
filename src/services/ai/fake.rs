use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::ConversationTurn;

use super::{LanguageModel, Message};

/// Deterministic stand-in for a language model in unit tests.
#[derive(Default)]
pub struct FakeLanguageModel {
    pub label: Option<String>,
    pub reply: Option<String>,
    pub summary: Option<String>,
    pub generate_requests: Mutex<Vec<Vec<Message>>>,
    pub classify_requests: Mutex<Vec<String>>,
}

impl FakeLanguageModel {
    /// Every capability fails.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn with_label(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            ..Self::default()
        }
    }

    pub fn with_reply(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
            ..Self::default()
        }
    }

    pub fn classify_count(&self) -> usize {
        self.classify_requests.lock().unwrap().len()
    }

    pub fn last_generate_request(&self) -> Option<Vec<Message>> {
        self.generate_requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for FakeLanguageModel {
    async fn classify_freeform(&self, text: &str) -> anyhow::Result<String> {
        self.classify_requests.lock().unwrap().push(text.to_string());
        self.label
            .clone()
            .ok_or_else(|| anyhow::anyhow!("language model unavailable"))
    }

    async fn generate_text(&self, messages: &[Message]) -> anyhow::Result<String> {
        self.generate_requests.lock().unwrap().push(messages.to_vec());
        self.reply
            .clone()
            .ok_or_else(|| anyhow::anyhow!("language model unavailable"))
    }

    async fn summarize(&self, _turns: &[ConversationTurn]) -> anyhow::Result<String> {
        self.summary
            .clone()
            .ok_or_else(|| anyhow::anyhow!("language model unavailable"))
    }
}
