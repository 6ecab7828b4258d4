use std::sync::Arc;

use chrono::Utc;

use crate::db::queries;
use crate::models::{
    Call, CallDirection, CallStatus, ConsultationRequest, EntityField, EntitySet, Intent, NewCall,
    NewTurn, Speaker,
};
use crate::services::receptionist::TurnOutcome;
use crate::state::AppState;

pub const CONSULTATION_CONFIRMATION: &str =
    " I've created your consultation request and you'll receive a confirmation call within 24 hours.";

const AI_TURN_CONFIDENCE: f64 = 0.9;
const CONSULTATION_SOURCE: &str = "ai_receptionist_call";
const DEFAULT_SERVICE: &str = "wellness_consultation";

/// Result of one processed caller utterance after it has been logged.
#[derive(Debug, Clone)]
pub struct HandledSpeech {
    pub outcome: TurnOutcome,
    /// What the caller hears. May extend `outcome.reply`.
    pub reply: String,
    /// Turn number of the logged AI reply.
    pub turn_number: i64,
    pub consultation_requested: bool,
}

/// Opens the call record for a new inbound call and logs the greeting as
/// turn 1. A repeated webhook for the same CallSid returns the existing call.
pub fn start_inbound_call(state: &Arc<AppState>, call_sid: &str, from: &str) -> anyhow::Result<Call> {
    let db = state.db()?;
    if let Some(existing) = queries::get_call_by_sid(&db, call_sid)? {
        tracing::info!(call_sid, "incoming call already recorded");
        return Ok(existing);
    }

    let call = queries::create_call(
        &db,
        &NewCall {
            call_sid: call_sid.to_string(),
            phone_number: from.to_string(),
            direction: CallDirection::Inbound,
            status: CallStatus::Answered,
            intent_detected: Some("initial_greeting".to_string()),
            conversation_summary: Some("Incoming call initiated".to_string()),
        },
    )?;

    queries::append_turn(
        &db,
        call.id,
        &NewTurn {
            speaker: Speaker::Ai,
            message: "Initial greeting and emergency notice".to_string(),
            intent: Some("greeting".to_string()),
            entities: EntitySet::new(),
            confidence_score: Some(1.0),
        },
    )?;

    tracing::info!(call_sid, call_id = call.id, from, "inbound call started");
    Ok(call)
}

/// Looks up the call for a speech webhook, creating an in-progress record
/// when the incoming-call webhook was never seen.
pub fn find_or_create_call(state: &Arc<AppState>, call_sid: &str, from: &str) -> anyhow::Result<Call> {
    let db = state.db()?;
    if let Some(call) = queries::get_call_by_sid(&db, call_sid)? {
        return Ok(call);
    }

    tracing::warn!(call_sid, "no call record for speech, creating one");
    queries::create_call(
        &db,
        &NewCall {
            call_sid: call_sid.to_string(),
            phone_number: from.to_string(),
            direction: CallDirection::Inbound,
            status: CallStatus::InProgress,
            intent_detected: None,
            conversation_summary: None,
        },
    )
}

/// Runs the receptionist over one utterance and logs both sides of the
/// exchange. An utterance carrying an emergency phrase skips the engine and
/// goes straight to an emergency transfer. `speech_confidence` is the
/// recognizer's score for the patient turn; without it the classification
/// confidence is stored.
///
/// All writes for the utterance commit together, so a failure part way
/// leaves no patient turn without its reply.
pub async fn handle_speech(
    state: &Arc<AppState>,
    call: &Call,
    speech: &str,
    speech_confidence: Option<f64>,
) -> anyhow::Result<HandledSpeech> {
    let outcome = match state.receptionist.screen_emergency(speech) {
        Some(outcome) => outcome,
        None => {
            let history = {
                let db = state.db()?;
                queries::get_turns(&db, call.id)?
            };
            state
                .receptionist
                .process_utterance(speech, &history)
                .await
        }
    };

    let db = state.db()?;
    let tx = db.unchecked_transaction()?;

    queries::append_turn(
        &tx,
        call.id,
        &NewTurn {
            speaker: Speaker::Patient,
            message: speech.to_string(),
            intent: Some(outcome.intent.to_string()),
            entities: outcome.entities.clone(),
            confidence_score: Some(speech_confidence.unwrap_or(outcome.confidence)),
        },
    )?;

    if let Some(name) = outcome.entities.get(EntityField::PatientName) {
        queries::set_caller_name(&tx, call.id, name)?;
    }

    let mut reply = outcome.reply.clone();
    let consultation_requested =
        outcome.intent == Intent::AppointmentScheduling && !outcome.entities.is_empty();
    if consultation_requested {
        let request = consultation_request(call, &outcome, speech);
        queries::create_consultation_request(&tx, &request)?;
        tracing::info!(
            call_sid = %call.call_sid,
            service = %request.service_type,
            "consultation request recorded"
        );
        reply.push_str(CONSULTATION_CONFIRMATION);
    }

    let ai_turn = queries::append_turn(
        &tx,
        call.id,
        &NewTurn {
            speaker: Speaker::Ai,
            message: reply.clone(),
            intent: Some(format!("response_to_{}", outcome.intent)),
            entities: EntitySet::new(),
            confidence_score: Some(AI_TURN_CONFIDENCE),
        },
    )?;

    queries::record_turn_analysis(
        &tx,
        call.id,
        outcome.intent.as_str(),
        outcome.confidence,
        &outcome.entities,
        &outcome.transfer,
    )?;

    tx.commit()?;

    if outcome.transfer.should_transfer {
        tracing::warn!(
            call_sid = %call.call_sid,
            reason = %outcome.transfer.reason,
            "transferring call to staff"
        );
    }

    Ok(HandledSpeech {
        outcome,
        reply,
        turn_number: ai_turn.turn_number,
        consultation_requested,
    })
}

fn consultation_request(call: &Call, outcome: &TurnOutcome, speech: &str) -> ConsultationRequest {
    let entities = &outcome.entities;
    let name = entities
        .get(EntityField::PatientName)
        .or(call.caller_name.as_deref())
        .unwrap_or("");
    let mut words = name.split_whitespace();
    let first_name = words.next().unwrap_or("").to_string();
    let last_name = words.collect::<Vec<_>>().join(" ");

    ConsultationRequest {
        call_id: call.id,
        first_name,
        last_name,
        phone: call.phone_number.clone(),
        service_type: entities
            .get(EntityField::ServiceType)
            .unwrap_or(DEFAULT_SERVICE)
            .to_string(),
        preferred_date: entities.get(EntityField::PreferredDate).unwrap_or("").to_string(),
        preferred_time: entities.get(EntityField::PreferredTime).unwrap_or("").to_string(),
        reason_for_visit: speech.to_string(),
        source: CONSULTATION_SOURCE.to_string(),
    }
}

/// Applies a provider status callback. On completion the call is closed
/// out with its duration and a summary of the logged turns.
pub async fn update_status(
    state: &Arc<AppState>,
    call_sid: &str,
    status: CallStatus,
    duration_seconds: i64,
) -> anyhow::Result<Option<Call>> {
    let (call, turns) = {
        let db = state.db()?;
        let Some(call) = queries::get_call_by_sid(&db, call_sid)? else {
            return Ok(None);
        };
        queries::update_call_status(&db, call.id, status)?;
        if status != CallStatus::Completed {
            return Ok(queries::get_call(&db, call.id)?);
        }
        let turns = queries::get_turns(&db, call.id)?;
        (call, turns)
    };

    let summary = if turns.is_empty() {
        None
    } else {
        Some(state.receptionist.summarize(&turns).await)
    };

    let db = state.db()?;
    queries::complete_call(&db, call.id, duration_seconds, summary.as_deref())?;
    tracing::info!(call_sid, duration_seconds, turns = turns.len(), "call completed");
    queries::get_call(&db, call.id)
}

/// Ends a call from the API side, measuring duration from the recorded
/// start time.
pub async fn end_call(state: &Arc<AppState>, call: &Call) -> anyhow::Result<Call> {
    let turns = {
        let db = state.db()?;
        queries::get_turns(&db, call.id)?
    };

    let summary = state.receptionist.summarize(&turns).await;
    let duration = (Utc::now().naive_utc() - call.started_at).num_seconds().max(0);

    let db = state.db()?;
    queries::complete_call(&db, call.id, duration, Some(&summary))?;
    tracing::info!(call_id = call.id, duration, "call ended");
    queries::get_call(&db, call.id)?
        .ok_or_else(|| anyhow::anyhow!("call {} disappeared", call.id))
}

/// Where a manual transfer sends the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferTarget {
    Reception,
    Emergency,
}

impl TransferTarget {
    pub fn parse(s: &str) -> Self {
        match s {
            "emergency" => TransferTarget::Emergency,
            _ => TransferTarget::Reception,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransferTarget::Reception => "reception",
            TransferTarget::Emergency => "emergency",
        }
    }
}

/// Hands a call to staff or emergency services and returns the number the
/// caller is sent to.
pub fn transfer_call(
    state: &Arc<AppState>,
    call: &Call,
    target: TransferTarget,
    reason: &str,
) -> anyhow::Result<String> {
    let info = &state.receptionist.profile().info;
    let number = match target {
        TransferTarget::Reception => info.transfer_number.clone(),
        TransferTarget::Emergency => info.emergency_number.clone(),
    };

    let db = state.db()?;
    queries::mark_transferred(&db, call.id, reason)?;
    tracing::warn!(
        call_id = call.id,
        target = target.as_str(),
        reason,
        "call transferred"
    );
    Ok(number)
}

/// Places an outbound call that speaks `message` and records it.
pub async fn place_outbound_call(
    state: &Arc<AppState>,
    phone_number: &str,
    message: &str,
    call_type: &str,
) -> anyhow::Result<Call> {
    let base = &state.config.public_base_url;
    let twiml_url = reqwest::Url::parse_with_params(
        &format!("{base}/api/voice/outbound-twiml"),
        &[("message", message)],
    )?;
    let status_callback = format!("{base}/api/voice/call-status");

    let call_sid = state
        .telephony
        .place_call(phone_number, twiml_url.as_str(), &status_callback)
        .await?;

    tracing::info!(call_sid = %call_sid, to = phone_number, call_type, "outbound call placed");

    let db = state.db()?;
    queries::create_call(
        &db,
        &NewCall {
            call_sid,
            phone_number: phone_number.to_string(),
            direction: CallDirection::Outbound,
            status: CallStatus::Initiated,
            intent_detected: Some(call_type.to_string()),
            conversation_summary: Some(format!("Outbound {call_type} call")),
        },
    )
}
