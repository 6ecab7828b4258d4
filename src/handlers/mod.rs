pub mod calls;
pub mod health;
pub mod voice;
pub mod webhook;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/voice/incoming-call", post(webhook::incoming_call))
        .route("/api/voice/process-speech", post(webhook::process_speech))
        .route("/api/voice/call-status", post(webhook::call_status))
        .route(
            "/api/voice/outbound-twiml",
            get(webhook::outbound_twiml).post(webhook::outbound_twiml),
        )
        .route("/api/voice/process", post(voice::process))
        .route("/api/voice/end-call", post(voice::end_call))
        .route("/api/voice/transfer-call", post(voice::transfer_call))
        .route("/api/voice/outbound-call", post(voice::outbound_call))
        .route("/api/voice/call-analytics", get(voice::call_analytics))
        .route("/api/calls", get(calls::list_calls))
        .route("/api/calls/:id", get(calls::get_call))
        .with_state(state)
}
