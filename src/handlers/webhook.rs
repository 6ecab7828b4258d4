//! Twilio voice webhooks. Every response is TwiML; a failure inside the
//! receptionist never leaves the caller in silence.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Form;
use base64::Engine;
use chrono::{Local, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha1::Sha1;

use crate::errors::AppError;
use crate::models::{CallStatus, Intent};
use crate::services::{calls, twiml};
use crate::state::AppState;

type TwilioParams = HashMap<String, String>;

pub fn validate_twilio_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &TwilioParams,
) -> bool {
    let mut data = url.to_string();
    let mut sorted: Vec<(&String, &String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in sorted {
        data.push_str(key);
        data.push_str(value);
    }

    let mut mac = match Hmac::<Sha1>::new_from_slice(auth_token.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(data.as_bytes());
    let expected = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

    expected == signature
}

/// Skipped when no auth token is configured (dev mode).
fn verify_request(
    state: &AppState,
    headers: &HeaderMap,
    uri: &Uri,
    params: &TwilioParams,
) -> Result<(), AppError> {
    let auth_token = &state.config.twilio_auth_token;
    if auth_token.is_empty() {
        return Ok(());
    }

    let signature = headers
        .get("x-twilio-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if signature.is_empty() {
        tracing::warn!(path = %uri.path(), "missing X-Twilio-Signature header");
        return Err(AppError::Forbidden("missing signature".to_string()));
    }

    let proto = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    let url = format!("{proto}://{host}{path}");

    if !validate_twilio_signature(auth_token, signature, &url, params) {
        tracing::warn!(url = %url, "invalid Twilio signature");
        return Err(AppError::Forbidden("invalid signature".to_string()));
    }
    Ok(())
}

fn twiml_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, twiml::CONTENT_TYPE)], body).into_response()
}

fn param<'a>(params: &'a TwilioParams, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

// POST /api/voice/incoming-call
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Form(params): Form<TwilioParams>,
) -> Result<Response, AppError> {
    verify_request(&state, &headers, &uri, &params)?;

    let from = param(&params, "From").unwrap_or("Unknown");
    let call_sid = match param(&params, "CallSid") {
        Some(sid) => sid.to_string(),
        None => format!("call_{}", Utc::now().format("%Y%m%d_%H%M%S")),
    };

    tracing::info!(call_sid = %call_sid, from, "incoming call");

    let info = &state.receptionist.profile().info;
    let body = match calls::start_inbound_call(&state, &call_sid, from) {
        Ok(_) => twiml::incoming_call(info, Local::now().naive_local()),
        Err(e) => {
            tracing::error!(error = %e, call_sid = %call_sid, "failed to start inbound call");
            twiml::say_and_hang_up(
                "I apologize, but I'm experiencing technical difficulties. Please call back in a few minutes.",
            )
        }
    };

    Ok(twiml_response(body))
}

// POST /api/voice/process-speech
pub async fn process_speech(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Form(params): Form<TwilioParams>,
) -> Result<Response, AppError> {
    verify_request(&state, &headers, &uri, &params)?;

    let Some(call_sid) = param(&params, "CallSid") else {
        tracing::error!("speech webhook without CallSid");
        return Err(AppError::BadRequest("missing CallSid".to_string()));
    };
    let from = param(&params, "From").unwrap_or("Unknown");
    let speech = param(&params, "SpeechResult").unwrap_or("");
    let speech_confidence = param(&params, "Confidence").and_then(|v| v.parse::<f64>().ok());

    if speech.is_empty() {
        tracing::info!(call_sid, "empty speech result");
        return Ok(twiml_response(twiml::apology()));
    }

    let call = match calls::find_or_create_call(&state, call_sid, from) {
        Ok(call) => call,
        Err(e) => {
            tracing::error!(error = %e, call_sid, "failed to load call");
            return Ok(twiml_response(twiml::apology()));
        }
    };

    let handled = match calls::handle_speech(&state, &call, speech, speech_confidence).await {
        Ok(handled) => handled,
        Err(e) => {
            tracing::error!(error = %e, call_sid, "speech processing failed");
            return Ok(twiml_response(twiml::apology()));
        }
    };

    let info = &state.receptionist.profile().info;
    let body = if handled.outcome.transfer.should_transfer {
        if handled.outcome.intent == Intent::Emergency {
            twiml::emergency_transfer(info, &handled.reply)
        } else {
            twiml::reception_transfer(info, &handled.reply)
        }
    } else {
        twiml::continue_conversation(&handled.reply)
    };

    Ok(twiml_response(body))
}

// POST /api/voice/call-status
pub async fn call_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    uri: Uri,
    Form(params): Form<TwilioParams>,
) -> Result<Response, AppError> {
    verify_request(&state, &headers, &uri, &params)?;

    let Some(call_sid) = param(&params, "CallSid") else {
        return Err(AppError::BadRequest("missing CallSid".to_string()));
    };
    let status = CallStatus::parse(param(&params, "CallStatus").unwrap_or(""));
    let duration = param(&params, "CallDuration")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(0);

    tracing::info!(call_sid, status = status.as_str(), "call status update");

    match calls::update_status(&state, call_sid, status, duration).await {
        Ok(Some(_)) => {}
        Ok(None) => tracing::warn!(call_sid, "status update for unknown call"),
        Err(e) => {
            tracing::error!(error = %e, call_sid, "failed to apply call status");
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, "Error").into_response());
        }
    }

    Ok((StatusCode::OK, "OK").into_response())
}

#[derive(Deserialize)]
pub struct OutboundTwimlQuery {
    pub message: Option<String>,
}

// GET|POST /api/voice/outbound-twiml?message=
pub async fn outbound_twiml(
    State(state): State<Arc<AppState>>,
    Query(query): Query<OutboundTwimlQuery>,
) -> Response {
    let message = query
        .message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Hello from {}.", state.receptionist.profile().info.name));

    twiml_response(twiml::say_and_hang_up(&message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(token: &str, url: &str, params: &TwilioParams) -> String {
        let mut data = url.to_string();
        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();
        for k in keys {
            data.push_str(k);
            data.push_str(&params[k]);
        }
        let mut mac = Hmac::<Sha1>::new_from_slice(token.as_bytes()).unwrap();
        mac.update(data.as_bytes());
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_signature_round_trip() {
        let mut params = TwilioParams::new();
        params.insert("CallSid".to_string(), "CA123".to_string());
        params.insert("From".to_string(), "+16105550123".to_string());
        let url = "https://example.com/api/voice/incoming-call";

        let signature = sign("secret", url, &params);
        assert!(validate_twilio_signature("secret", &signature, url, &params));
        assert!(!validate_twilio_signature("other", &signature, url, &params));

        params.insert("SpeechResult".to_string(), "tampered".to_string());
        assert!(!validate_twilio_signature("secret", &signature, url, &params));
    }

    #[test]
    fn test_param_ignores_blank_values() {
        let mut params = TwilioParams::new();
        params.insert("CallSid".to_string(), "   ".to_string());
        params.insert("From".to_string(), " +1610 ".to_string());
        assert_eq!(param(&params, "CallSid"), None);
        assert_eq!(param(&params, "From"), Some("+1610"));
        assert_eq!(param(&params, "To"), None);
    }
}
