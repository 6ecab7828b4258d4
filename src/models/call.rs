use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::intent::EntitySet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    Inbound,
    Outbound,
}

impl CallDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallDirection::Inbound => "inbound",
            CallDirection::Outbound => "outbound",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "outbound" => CallDirection::Outbound,
            _ => CallDirection::Inbound,
        }
    }
}

/// Twilio call lifecycle states, stored with Twilio's own spelling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    Initiated,
    Ringing,
    Answered,
    InProgress,
    Completed,
    Busy,
    NoAnswer,
    Failed,
    Canceled,
    /// Handed to staff or emergency services by the practice.
    Transferred,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Initiated => "initiated",
            CallStatus::Ringing => "ringing",
            CallStatus::Answered => "answered",
            CallStatus::InProgress => "in-progress",
            CallStatus::Completed => "completed",
            CallStatus::Busy => "busy",
            CallStatus::NoAnswer => "no-answer",
            CallStatus::Failed => "failed",
            CallStatus::Canceled => "canceled",
            CallStatus::Transferred => "transferred",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "ringing" => CallStatus::Ringing,
            "answered" => CallStatus::Answered,
            "in-progress" | "in_progress" => CallStatus::InProgress,
            "completed" => CallStatus::Completed,
            "busy" => CallStatus::Busy,
            "no-answer" | "no_answer" => CallStatus::NoAnswer,
            "failed" => CallStatus::Failed,
            "canceled" | "cancelled" => CallStatus::Canceled,
            "transferred" => CallStatus::Transferred,
            _ => CallStatus::Initiated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    pub id: i64,
    pub call_sid: String,
    pub phone_number: String,
    pub caller_name: Option<String>,
    pub direction: CallDirection,
    pub status: CallStatus,
    pub duration_seconds: i64,
    pub started_at: NaiveDateTime,
    pub ended_at: Option<NaiveDateTime>,
    pub conversation_summary: Option<String>,
    pub intent_detected: Option<String>,
    pub entities: EntitySet,
    pub ai_confidence_score: Option<f64>,
    pub human_transfer_required: bool,
    pub transfer_reason: Option<String>,
    pub appointment_requested: bool,
    pub follow_up_required: bool,
}

#[derive(Debug, Clone)]
pub struct NewCall {
    pub call_sid: String,
    pub phone_number: String,
    pub direction: CallDirection,
    pub status: CallStatus,
    pub intent_detected: Option<String>,
    pub conversation_summary: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Patient,
    Ai,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::Patient => "patient",
            Speaker::Ai => "ai",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "patient" => Speaker::Patient,
            _ => Speaker::Ai,
        }
    }
}

/// One logged utterance. Rows are append-only; `turn_number` starts at 1
/// and has no gaps within a call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: i64,
    pub call_id: i64,
    pub turn_number: i64,
    pub speaker: Speaker,
    pub message: String,
    pub intent: Option<String>,
    pub entities: EntitySet,
    pub confidence_score: Option<f64>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct NewTurn {
    pub speaker: Speaker,
    pub message: String,
    pub intent: Option<String>,
    pub entities: EntitySet,
    pub confidence_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TransferDecision {
    pub should_transfer: bool,
    pub reason: String,
}

impl TransferDecision {
    pub fn transfer(reason: &str) -> Self {
        Self {
            should_transfer: true,
            reason: reason.to_string(),
        }
    }

    pub fn stay() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRequest {
    pub call_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub service_type: String,
    pub preferred_date: String,
    pub preferred_time: String,
    pub reason_for_visit: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntentCount {
    pub intent: String,
    pub count: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallAnalytics {
    pub total_calls: i64,
    pub inbound_calls: i64,
    pub outbound_calls: i64,
    pub completed_calls: i64,
    pub transferred_calls: i64,
    pub appointment_requests: i64,
    pub average_ai_confidence: f64,
    pub average_call_duration: f64,
    pub ai_success_rate: f64,
    pub intent_distribution: Vec<IntentCount>,
}
