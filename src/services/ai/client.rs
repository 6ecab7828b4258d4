use async_trait::async_trait;

use crate::models::ConversationTurn;

use super::{ChatOptions, LanguageModel, LlmProvider, Message};

const CLASSIFY_PROMPT: &str = r#"You are an AI assistant helping to classify patient intents for a medical practice.
Classify the following message into one of these categories:
- appointment_scheduling: Patient wants to schedule a new appointment
- appointment_modification: Patient wants to change/cancel existing appointment
- service_inquiry: Patient asking about services, treatments, or procedures
- billing_inquiry: Patient asking about costs, insurance, or billing
- general_info: Patient asking about practice hours, location, contact info
- emergency: Patient has urgent medical need or emergency

Respond with only the category name."#;

const SUMMARY_PROMPT: &str = r#"Summarize this phone conversation between a patient and AI receptionist.
Include: patient's main request, any appointments scheduled, information provided, and next steps.
Keep it concise and professional."#;

const CLASSIFY_OPTIONS: ChatOptions = ChatOptions {
    max_tokens: 50,
    temperature: 0.1,
};

const GENERATE_OPTIONS: ChatOptions = ChatOptions {
    max_tokens: 300,
    temperature: 0.7,
};

const SUMMARY_OPTIONS: ChatOptions = ChatOptions {
    max_tokens: 200,
    temperature: 0.3,
};

/// [`LanguageModel`] backed by a chat-completion provider.
pub struct ChatLanguageModel {
    provider: Box<dyn LlmProvider>,
}

impl ChatLanguageModel {
    pub fn new(provider: Box<dyn LlmProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl LanguageModel for ChatLanguageModel {
    async fn classify_freeform(&self, text: &str) -> anyhow::Result<String> {
        let messages = [Message::system(CLASSIFY_PROMPT), Message::user(text)];
        self.provider.chat(&messages, CLASSIFY_OPTIONS).await
    }

    async fn generate_text(&self, messages: &[Message]) -> anyhow::Result<String> {
        self.provider.chat(messages, GENERATE_OPTIONS).await
    }

    async fn summarize(&self, turns: &[ConversationTurn]) -> anyhow::Result<String> {
        let transcript = turns
            .iter()
            .map(|t| format!("{}: {}", t.speaker.as_str(), t.message))
            .collect::<Vec<_>>()
            .join("\n");

        let messages = [Message::system(SUMMARY_PROMPT), Message::user(transcript)];
        self.provider.chat(&messages, SUMMARY_OPTIONS).await
    }
}
