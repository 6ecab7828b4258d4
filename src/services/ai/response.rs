use std::sync::Arc;

use crate::models::{ConversationTurn, EntitySet, Intent, PracticeProfile, Speaker};
use crate::services::ai::{LanguageModel, Message};

/// How many prior turns are replayed to the model.
pub const HISTORY_WINDOW: usize = 6;

pub struct ResponseGenerator {
    profile: Arc<PracticeProfile>,
    llm: Arc<dyn LanguageModel>,
}

impl ResponseGenerator {
    pub fn new(profile: Arc<PracticeProfile>, llm: Arc<dyn LanguageModel>) -> Self {
        Self { profile, llm }
    }

    /// Always yields something to say. Emergencies get the fixed safety
    /// script; any model failure gets the per-intent fallback.
    pub async fn generate(
        &self,
        utterance: &str,
        intent: Intent,
        entities: &EntitySet,
        history: &[ConversationTurn],
    ) -> String {
        if intent == Intent::Emergency {
            return self.emergency_script();
        }

        let messages = self.build_messages(utterance, intent, entities, history);
        match self.llm.generate_text(&messages).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
            Ok(_) => {
                tracing::warn!(intent = %intent, "model returned empty reply, using fallback");
                self.fallback(intent)
            }
            Err(e) => {
                tracing::error!(error = %e, intent = %intent, "response generation failed, using fallback");
                self.fallback(intent)
            }
        }
    }

    pub fn emergency_script(&self) -> String {
        format!(
            "I understand this may be an emergency situation. If this is a life-threatening emergency, \
             please hang up and call {} immediately. For urgent medical concerns, I'm transferring you \
             to our on-call provider right away. Please stay on the line.",
            self.profile.info.emergency_number
        )
    }

    pub fn fallback(&self, intent: Intent) -> String {
        let info = &self.profile.info;
        match intent {
            Intent::AppointmentScheduling => format!(
                "I'd be happy to help you schedule an appointment. We offer consultations for {}. \
                 What type of service are you interested in, and do you have a preferred date and time? \
                 You can also visit our website or call us at {}.",
                self.profile.service_names(),
                info.phone
            ),
            Intent::ServiceInquiry => {
                let lines: Vec<String> = self
                    .profile
                    .services
                    .iter()
                    .map(|s| format!("- {} (${}, {} min)", s.name, s.price, s.duration_minutes))
                    .collect();
                format!(
                    "We offer several wellness services including:\n{}\nWhich service would you like to know more about?",
                    lines.join("\n")
                )
            }
            Intent::GeneralInfo => format!(
                "Here's our practice information: {}. Phone: {}. Hours: {}. Location: {}. \
                 How else can I help you today?",
                info.name, info.phone, info.hours, info.address
            ),
            Intent::BillingInquiry => "For billing questions, insurance coverage, and payment information, \
                 I'll connect you with our billing department. They can provide detailed information \
                 about costs, insurance coverage, and payment options. Would you like me to transfer you now?"
                .to_string(),
            Intent::AppointmentModification | Intent::Emergency => format!(
                "Thank you for calling {}. I'm here to help with appointments, service information, \
                 and general questions. How can I assist you today?",
                info.name
            ),
        }
    }

    fn system_prompt(&self, intent: Intent, entities: &EntitySet) -> String {
        let info = &self.profile.info;
        format!(
            "You are a professional AI receptionist for {name}, a wellness practice offering {services}.

Practice Information:
- Phone: {phone}
- Hours: {hours}
- Location: {address}

Services and Pricing:
{catalog}

Guidelines:
- Be professional, warm, and helpful
- For appointment scheduling, ask for preferred date/time and service type
- Provide accurate service information and pricing
- For billing questions, direct to billing department
- Always offer to help further
- Keep responses concise but informative
- If you can't help, offer to transfer to staff

Current conversation intent: {intent}
Extracted information: {entities}",
            name = info.name,
            services = self.profile.service_names(),
            phone = info.phone,
            hours = info.hours,
            address = info.address,
            catalog = self.profile.catalog_json(),
            intent = intent,
            entities = entities.to_json(),
        )
    }

    fn build_messages(
        &self,
        utterance: &str,
        intent: Intent,
        entities: &EntitySet,
        history: &[ConversationTurn],
    ) -> Vec<Message> {
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        let mut messages = Vec::with_capacity(HISTORY_WINDOW + 2);
        messages.push(Message::system(self.system_prompt(intent, entities)));

        for turn in &history[start..] {
            messages.push(match turn.speaker {
                Speaker::Patient => Message::user(turn.message.clone()),
                Speaker::Ai => Message::assistant(turn.message.clone()),
            });
        }

        messages.push(Message::user(utterance));
        messages
    }
}
