use crate::models::{Intent, TransferDecision};

pub const EMERGENCY_REASON: &str = "Emergency situation requiring immediate human attention";
pub const LOW_CONFIDENCE_REASON: &str = "Low confidence in understanding patient request";
pub const EXTENDED_CONVERSATION_REASON: &str = "Extended conversation requiring human assistance";
pub const BILLING_REASON: &str = "Billing inquiry requiring specialist assistance";

/// Decides when a live call is handed to a person. Rules are checked in
/// order and the first match wins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferPolicy {
    /// Confidence strictly below this transfers.
    pub min_confidence: f64,
    /// More prior turns than this transfers.
    pub max_turns: usize,
    /// Billing questions above this confidence go to the billing desk.
    pub billing_confidence: f64,
}

impl Default for TransferPolicy {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            max_turns: 10,
            billing_confidence: 0.7,
        }
    }
}

impl TransferPolicy {
    /// `turn_count` is the number of turns logged before this utterance.
    pub fn evaluate(&self, intent: Intent, confidence: f64, turn_count: usize) -> TransferDecision {
        if intent == Intent::Emergency {
            return TransferDecision::transfer(EMERGENCY_REASON);
        }
        if confidence < self.min_confidence {
            return TransferDecision::transfer(LOW_CONFIDENCE_REASON);
        }
        if turn_count > self.max_turns {
            return TransferDecision::transfer(EXTENDED_CONVERSATION_REASON);
        }
        if intent == Intent::BillingInquiry && confidence > self.billing_confidence {
            return TransferDecision::transfer(BILLING_REASON);
        }
        TransferDecision::stay()
    }
}
