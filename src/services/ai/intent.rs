use std::sync::Arc;

use crate::models::{Intent, IntentKeywords};
use crate::services::ai::LanguageModel;

/// Confidence assigned to a label returned by the language model.
pub const MODEL_CONFIDENCE: f64 = 0.8;

/// Terminal answer when neither keywords nor the model produce an intent.
pub const DEFAULT_INTENT: Intent = Intent::GeneralInfo;
pub const DEFAULT_CONFIDENCE: f64 = 0.3;

/// Keyword-scoring intent classifier with a single language-model fallback.
///
/// Each intent's score is its matched-keyword count divided by the size of
/// *its own* keyword list, so scores are not comparable across intents
/// whose lists differ in length.
pub struct IntentClassifier {
    registry: Vec<IntentKeywords>,
    llm: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(registry: &[IntentKeywords], llm: Arc<dyn LanguageModel>) -> Self {
        let registry = registry
            .iter()
            .map(|entry| IntentKeywords {
                intent: entry.intent,
                keywords: entry
                    .keywords
                    .iter()
                    .map(|k| k.to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .filter(|entry| !entry.keywords.is_empty())
            .collect();

        Self { registry, llm }
    }

    /// Every intent with at least one keyword hit, in registry order.
    pub fn keyword_scores(&self, utterance: &str) -> Vec<(Intent, f64)> {
        let text = utterance.to_lowercase();
        self.registry
            .iter()
            .filter_map(|entry| {
                let matches = entry
                    .keywords
                    .iter()
                    .filter(|k| text.contains(k.as_str()))
                    .count();
                (matches > 0).then(|| (entry.intent, matches as f64 / entry.keywords.len() as f64))
            })
            .collect()
    }

    /// Highest keyword score; ties go to the earlier registry entry.
    pub fn best_keyword_match(&self, utterance: &str) -> Option<(Intent, f64)> {
        self.keyword_scores(utterance)
            .into_iter()
            .fold(None, |best, (intent, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((intent, score)),
            })
    }

    /// Never fails: a model error or unrecognized label degrades to
    /// `(general_info, 0.3)`.
    pub async fn classify(&self, utterance: &str) -> (Intent, f64) {
        if let Some(found) = self.best_keyword_match(utterance) {
            return found;
        }

        match self.llm.classify_freeform(utterance).await {
            Ok(label) => match parse_label(&label) {
                Some(intent) => return (intent, MODEL_CONFIDENCE),
                None => tracing::warn!(label = %label, "model returned unknown intent label"),
            },
            Err(e) => tracing::error!(error = %e, "model intent classification failed"),
        }

        (DEFAULT_INTENT, DEFAULT_CONFIDENCE)
    }
}

fn parse_label(raw: &str) -> Option<Intent> {
    let cleaned = raw
        .trim()
        .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '.')
        .trim()
        .to_lowercase();
    Intent::parse(&cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PracticeProfile;
    use crate::services::ai::fake::FakeLanguageModel;

    fn classifier(llm: FakeLanguageModel) -> (IntentClassifier, Arc<FakeLanguageModel>) {
        let llm = Arc::new(llm);
        let profile = PracticeProfile::default();
        (IntentClassifier::new(&profile.intents, llm.clone()), llm)
    }

    #[tokio::test]
    async fn test_single_intent_keywords_score_by_list_size() {
        let (c, llm) = classifier(FakeLanguageModel::unavailable());

        let (intent, confidence) = c.classify("What are your hours and where is parking?").await;
        assert_eq!(intent, Intent::GeneralInfo);
        assert!((confidence - 2.0 / 7.0).abs() < 1e-9);

        let (intent, confidence) = c.classify("I need to reschedule").await;
        assert_eq!(intent, Intent::AppointmentModification);
        assert!((confidence - 1.0 / 8.0).abs() < 1e-9);

        assert_eq!(llm.classify_count(), 0);
    }

    #[tokio::test]
    async fn test_scheduling_scenario() {
        let (c, _) = classifier(FakeLanguageModel::unavailable());
        let (intent, confidence) = c
            .classify("I need to schedule an appointment for tomorrow at 2pm")
            .await;
        assert_eq!(intent, Intent::AppointmentScheduling);
        assert!((confidence - 2.0 / 9.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_tie_goes_to_earlier_intent() {
        // "cost" belongs to both service_inquiry (1/10) and billing_inquiry (1/9);
        // add "price" so service_inquiry reaches 2/10 and wins outright.
        let (c, _) = classifier(FakeLanguageModel::unavailable());
        let (intent, _) = c.classify("what does the cost and price look like").await;
        assert_eq!(intent, Intent::ServiceInquiry);

        let registry = vec![
            IntentKeywords {
                intent: Intent::ServiceInquiry,
                keywords: vec!["cost".to_string()],
            },
            IntentKeywords {
                intent: Intent::BillingInquiry,
                keywords: vec!["cost".to_string()],
            },
        ];
        let tied = IntentClassifier::new(&registry, Arc::new(FakeLanguageModel::unavailable()));
        assert_eq!(
            tied.best_keyword_match("the cost"),
            Some((Intent::ServiceInquiry, 1.0))
        );
    }

    #[tokio::test]
    async fn test_per_list_normalization_quirk_is_preserved() {
        // One hit each: billing scores 1/9, general_info 1/7 and wins on its
        // shorter list alone.
        let (c, _) = classifier(FakeLanguageModel::unavailable());
        let scores = c.keyword_scores("fee phone");
        assert_eq!(scores.len(), 2);
        assert_eq!(
            c.best_keyword_match("fee phone").map(|(i, _)| i),
            Some(Intent::GeneralInfo)
        );
    }

    #[tokio::test]
    async fn test_no_keywords_and_failing_model_defaults() {
        let (c, llm) = classifier(FakeLanguageModel::unavailable());
        let result = c.classify("Good afternoon").await;
        assert_eq!(result, (Intent::GeneralInfo, 0.3));
        assert_eq!(llm.classify_count(), 1);
    }

    #[tokio::test]
    async fn test_model_label_used_with_fixed_confidence() {
        let (c, _) = classifier(FakeLanguageModel::with_label("  Billing_Inquiry\n"));
        assert_eq!(
            c.classify("who handles my statement").await,
            (Intent::BillingInquiry, 0.8)
        );
    }

    #[tokio::test]
    async fn test_unrecognized_model_label_defaults() {
        let (c, _) = classifier(FakeLanguageModel::with_label("prescription_refill"));
        assert_eq!(
            c.classify("I want a refill").await,
            (Intent::GeneralInfo, 0.3)
        );
    }

    #[test]
    fn test_empty_keyword_lists_are_ignored() {
        let registry = vec![IntentKeywords {
            intent: Intent::Emergency,
            keywords: vec![String::new()],
        }];
        let c = IntentClassifier::new(&registry, Arc::new(FakeLanguageModel::unavailable()));
        assert!(c.keyword_scores("anything at all").is_empty());
    }
}
