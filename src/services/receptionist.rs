use std::sync::Arc;

use serde::Serialize;

use crate::models::{ConversationTurn, EntitySet, Intent, PracticeProfile, TransferDecision};
use crate::services::ai::entities::EntityExtractor;
use crate::services::ai::intent::IntentClassifier;
use crate::services::ai::response::ResponseGenerator;
use crate::services::ai::transfer::TransferPolicy;
use crate::services::ai::LanguageModel;

/// Everything decided about one caller utterance.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub intent: Intent,
    pub confidence: f64,
    pub entities: EntitySet,
    pub reply: String,
    pub transfer: TransferDecision,
}

/// Per-practice receptionist engine. Holds only immutable configuration;
/// call state arrives with each request as explicit history.
pub struct Receptionist {
    profile: Arc<PracticeProfile>,
    llm: Arc<dyn LanguageModel>,
    classifier: IntentClassifier,
    extractor: EntityExtractor,
    generator: ResponseGenerator,
    policy: TransferPolicy,
}

impl Receptionist {
    pub fn new(profile: PracticeProfile, llm: Arc<dyn LanguageModel>) -> Self {
        Self::with_policy(profile, llm, TransferPolicy::default())
    }

    pub fn with_policy(
        profile: PracticeProfile,
        llm: Arc<dyn LanguageModel>,
        policy: TransferPolicy,
    ) -> Self {
        let profile = Arc::new(profile);
        Self {
            classifier: IntentClassifier::new(&profile.intents, Arc::clone(&llm)),
            extractor: EntityExtractor::new(&profile.services),
            generator: ResponseGenerator::new(Arc::clone(&profile), Arc::clone(&llm)),
            policy,
            profile,
            llm,
        }
    }

    pub fn profile(&self) -> &PracticeProfile {
        &self.profile
    }

    pub async fn classify(&self, utterance: &str) -> (Intent, f64) {
        self.classifier.classify(utterance).await
    }

    pub fn extract(&self, utterance: &str, intent: Intent) -> EntitySet {
        self.extractor.extract(utterance, intent)
    }

    pub async fn generate(
        &self,
        utterance: &str,
        intent: Intent,
        entities: &EntitySet,
        history: &[ConversationTurn],
    ) -> String {
        self.generator.generate(utterance, intent, entities, history).await
    }

    pub fn should_transfer(&self, intent: Intent, confidence: f64, turn_count: usize) -> TransferDecision {
        self.policy.evaluate(intent, confidence, turn_count)
    }

    /// Checks `utterance` against the practice's emergency phrases. A hit
    /// skips classification and the model entirely.
    pub fn screen_emergency(&self, utterance: &str) -> Option<TurnOutcome> {
        let keyword = self.profile.emergency_keyword(utterance)?;
        tracing::warn!(keyword, "emergency phrase in utterance");

        Some(TurnOutcome {
            intent: Intent::Emergency,
            confidence: 1.0,
            entities: EntitySet::new(),
            reply: self.generator.emergency_script(),
            transfer: TransferDecision::transfer(&format!("Emergency keyword detected: {keyword}")),
        })
    }

    /// classify → extract → generate → decide-transfer. `history` is every
    /// turn logged for the call so far, oldest first.
    pub async fn process_utterance(&self, utterance: &str, history: &[ConversationTurn]) -> TurnOutcome {
        let (intent, confidence) = self.classify(utterance).await;
        let entities = self.extract(utterance, intent);
        let reply = self.generate(utterance, intent, &entities, history).await;
        let transfer = self.should_transfer(intent, confidence, history.len());

        tracing::info!(
            intent = %intent,
            confidence,
            entities = entities.len(),
            transfer = transfer.should_transfer,
            "processed utterance"
        );

        TurnOutcome {
            intent,
            confidence,
            entities,
            reply,
            transfer,
        }
    }

    pub async fn summarize(&self, turns: &[ConversationTurn]) -> String {
        if turns.is_empty() {
            return "No conversation recorded".to_string();
        }

        match self.llm.summarize(turns).await {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => summary_failed(turns.len()),
            Err(e) => {
                tracing::error!(error = %e, "conversation summary failed");
                summary_failed(turns.len())
            }
        }
    }
}

fn summary_failed(turns: usize) -> String {
    format!("Conversation with {turns} exchanges - summary generation failed")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{EntityField, Speaker};
    use crate::services::ai::fake::FakeLanguageModel;
    use crate::services::ai::transfer::{BILLING_REASON, EMERGENCY_REASON, LOW_CONFIDENCE_REASON};

    fn receptionist(llm: FakeLanguageModel) -> Receptionist {
        Receptionist::new(PracticeProfile::default(), Arc::new(llm))
    }

    fn turns(n: usize) -> Vec<ConversationTurn> {
        (1..=n as i64)
            .map(|i| ConversationTurn {
                id: i,
                call_id: 7,
                turn_number: i,
                speaker: Speaker::Patient,
                message: "hi".to_string(),
                intent: None,
                entities: EntitySet::new(),
                confidence_score: None,
                created_at: Utc::now().naive_utc(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_scheduling_turn() {
        let r = receptionist(FakeLanguageModel::with_reply("Great, what service are you interested in?"));
        let outcome = r
            .process_utterance("I need to schedule an appointment for tomorrow at 2pm", &turns(1))
            .await;

        assert_eq!(outcome.intent, Intent::AppointmentScheduling);
        assert!(outcome.confidence > 0.0);
        assert_eq!(outcome.entities.get(EntityField::PreferredDate), Some("tomorrow"));
        assert_eq!(outcome.entities.get(EntityField::PreferredTime), Some("2pm"));
        assert_eq!(outcome.reply, "Great, what service are you interested in?");
        // 2 of 9 scheduling keywords scores 0.22, under the confidence floor.
        assert_eq!(outcome.transfer, TransferDecision::transfer(LOW_CONFIDENCE_REASON));
    }

    #[tokio::test]
    async fn test_emergency_turn_transfers_with_script() {
        let r = receptionist(FakeLanguageModel::unavailable());
        let outcome = r.process_utterance("I think this is an emergency", &[]).await;
        assert_eq!(outcome.intent, Intent::Emergency);
        assert!(outcome.reply.contains("hang up and call 911"));
        assert_eq!(outcome.transfer, TransferDecision::transfer(EMERGENCY_REASON));
    }

    #[test]
    fn test_emergency_screen_beats_outscoring_intents() {
        let r = receptionist(FakeLanguageModel::with_reply("unused"));
        let outcome = r
            .screen_emergency("I'm bleeding and need to schedule an appointment to come in")
            .unwrap();
        assert_eq!(outcome.intent, Intent::Emergency);
        assert_eq!(outcome.confidence, 1.0);
        assert!(outcome.reply.contains("hang up and call 911"));
        assert_eq!(
            outcome.transfer,
            TransferDecision::transfer("Emergency keyword detected: bleeding")
        );

        assert!(r.screen_emergency("I need to schedule an appointment").is_none());
    }

    #[tokio::test]
    async fn test_billing_turn_transfers() {
        let r = receptionist(FakeLanguageModel::unavailable());
        let outcome = r
            .process_utterance(
                "question about my bill, payment, insurance coverage, copay, deductible and a fee charge",
                &[],
            )
            .await;
        assert_eq!(outcome.intent, Intent::BillingInquiry);
        assert!(outcome.confidence > 0.7);
        assert_eq!(outcome.transfer, TransferDecision::transfer(BILLING_REASON));
        assert!(outcome.reply.contains("billing department"));
    }

    #[tokio::test]
    async fn test_turn_count_is_history_length() {
        let r = receptionist(FakeLanguageModel::with_reply("Our hours are 8 to 6."));
        let question = "what are your hours, address and phone for directions";
        let at_limit = r.process_utterance(question, &turns(10)).await;
        assert!(at_limit.confidence >= 0.3);
        assert!(!at_limit.transfer.should_transfer);
        let past_limit = r.process_utterance(question, &turns(11)).await;
        assert!(past_limit.transfer.should_transfer);
    }

    #[tokio::test]
    async fn test_independent_profiles() {
        let mut custom = PracticeProfile::default();
        custom.info.name = "Easton Wellness".to_string();
        let a = Receptionist::new(custom, Arc::new(FakeLanguageModel::unavailable()));
        let b = receptionist(FakeLanguageModel::unavailable());

        let reply_a = a.generate("hi", Intent::AppointmentModification, &EntitySet::new(), &[]).await;
        let reply_b = b.generate("hi", Intent::AppointmentModification, &EntitySet::new(), &[]).await;
        assert!(reply_a.contains("Easton Wellness"));
        assert!(reply_b.contains("Lehigh Valley Wellness"));
    }

    #[tokio::test]
    async fn test_summary_fallbacks() {
        let r = receptionist(FakeLanguageModel::unavailable());
        assert_eq!(r.summarize(&[]).await, "No conversation recorded");
        assert_eq!(
            r.summarize(&turns(4)).await,
            "Conversation with 4 exchanges - summary generation failed"
        );

        let r = receptionist(FakeLanguageModel {
            summary: Some("Patient asked about hours.".to_string()),
            ..FakeLanguageModel::default()
        });
        assert_eq!(r.summarize(&turns(2)).await, "Patient asked about hours.");
    }
}
