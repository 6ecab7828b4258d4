use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{CallAnalytics, CallStatus, EntitySet, Intent};
use crate::services::calls;
use crate::state::AppState;

// POST /api/voice/process
#[derive(Deserialize)]
pub struct ProcessRequest {
    pub call_id: Option<i64>,
    #[serde(default)]
    pub speech_text: String,
}

#[derive(Serialize)]
pub struct ProcessResponse {
    pub call_id: i64,
    pub response: String,
    pub intent: Intent,
    pub confidence: f64,
    pub entities: EntitySet,
    pub should_transfer: bool,
    pub transfer_reason: String,
    pub turn_number: i64,
    pub consultation_requested: bool,
}

pub async fn process(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, AppError> {
    let call_id = req
        .call_id
        .ok_or_else(|| AppError::BadRequest("missing call_id".to_string()))?;
    let speech = req.speech_text.trim();
    if speech.is_empty() {
        return Err(AppError::BadRequest("no speech text provided".to_string()));
    }

    let call = {
        let db = state.db()?;
        queries::get_call(&db, call_id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("call {call_id}")))?;

    let handled = calls::handle_speech(&state, &call, speech, None).await?;
    let outcome = handled.outcome;

    Ok(Json(ProcessResponse {
        call_id,
        response: handled.reply,
        intent: outcome.intent,
        confidence: outcome.confidence,
        entities: outcome.entities,
        should_transfer: outcome.transfer.should_transfer,
        transfer_reason: outcome.transfer.reason,
        turn_number: handled.turn_number,
        consultation_requested: handled.consultation_requested,
    }))
}

// POST /api/voice/end-call
#[derive(Deserialize)]
pub struct EndCallRequest {
    pub call_id: Option<i64>,
}

#[derive(Serialize)]
pub struct EndCallResponse {
    pub call_id: i64,
    pub status: String,
    pub duration: i64,
    pub summary: Option<String>,
}

pub async fn end_call(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EndCallRequest>,
) -> Result<Json<EndCallResponse>, AppError> {
    let call_id = req
        .call_id
        .ok_or_else(|| AppError::BadRequest("missing call_id".to_string()))?;

    let call = {
        let db = state.db()?;
        queries::get_call(&db, call_id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("call {call_id}")))?;

    let ended = calls::end_call(&state, &call).await?;

    Ok(Json(EndCallResponse {
        call_id,
        status: ended.status.as_str().to_string(),
        duration: ended.duration_seconds,
        summary: ended.conversation_summary,
    }))
}

// POST /api/voice/transfer-call
#[derive(Deserialize)]
pub struct TransferCallRequest {
    pub call_id: Option<i64>,
    pub transfer_type: Option<String>,
    pub reason: Option<String>,
}

#[derive(Serialize)]
pub struct TransferCallResponse {
    pub call_id: i64,
    pub status: String,
    pub transfer_type: String,
    pub transfer_to: String,
    pub reason: String,
}

pub async fn transfer_call(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TransferCallRequest>,
) -> Result<Json<TransferCallResponse>, AppError> {
    let call_id = req
        .call_id
        .ok_or_else(|| AppError::BadRequest("missing call_id".to_string()))?;
    let target = calls::TransferTarget::parse(req.transfer_type.as_deref().unwrap_or("reception"));
    let reason = req
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| "Patient request".to_string());

    let call = {
        let db = state.db()?;
        queries::get_call(&db, call_id)?
    }
    .ok_or_else(|| AppError::NotFound(format!("call {call_id}")))?;

    let transfer_to = calls::transfer_call(&state, &call, target, &reason)?;

    Ok(Json(TransferCallResponse {
        call_id,
        status: CallStatus::Transferred.as_str().to_string(),
        transfer_type: target.as_str().to_string(),
        transfer_to,
        reason,
    }))
}

// POST /api/voice/outbound-call
#[derive(Deserialize)]
pub struct OutboundCallRequest {
    pub phone_number: Option<String>,
    pub message: Option<String>,
    pub call_type: Option<String>,
}

#[derive(Serialize)]
pub struct OutboundCallResponse {
    pub success: bool,
    pub call_id: i64,
    pub call_sid: String,
    pub message: String,
}

pub async fn outbound_call(
    State(state): State<Arc<AppState>>,
    Json(req): Json<OutboundCallRequest>,
) -> Result<Json<OutboundCallResponse>, AppError> {
    let phone_number = req
        .phone_number
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("missing phone_number".to_string()))?;

    if state.config.twilio_account_sid.is_empty() {
        return Err(AppError::Config("Twilio voice is not configured".to_string()));
    }

    let message = req
        .message
        .unwrap_or_else(|| format!("Hello from {}.", state.receptionist.profile().info.name));
    let call_type = req.call_type.unwrap_or_else(|| "general".to_string());

    let call = calls::place_outbound_call(&state, phone_number, &message, &call_type)
        .await
        .map_err(|e| AppError::Telephony(e.to_string()))?;

    Ok(Json(OutboundCallResponse {
        success: true,
        call_id: call.id,
        message: format!("Outbound call initiated to {}", call.phone_number),
        call_sid: call.call_sid,
    }))
}

// GET /api/voice/call-analytics
pub async fn call_analytics(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CallAnalytics>, AppError> {
    let db = state.db()?;
    Ok(Json(queries::get_call_analytics(&db)?))
}
