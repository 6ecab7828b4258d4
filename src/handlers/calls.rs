use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Call, ConsultationRequest, ConversationTurn};
use crate::state::AppState;

const MAX_LIMIT: i64 = 200;

// GET /api/calls
#[derive(Deserialize)]
pub struct CallsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_calls(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallsQuery>,
) -> Result<Json<Vec<Call>>, AppError> {
    let limit = query.limit.unwrap_or(50).clamp(1, MAX_LIMIT);
    let db = state.db()?;
    let calls = queries::list_calls(&db, query.status.as_deref(), limit)?;
    Ok(Json(calls))
}

// GET /api/calls/:id
#[derive(Serialize)]
pub struct CallDetail {
    #[serde(flatten)]
    pub call: Call,
    pub turns: Vec<ConversationTurn>,
    pub consultation_requests: Vec<ConsultationRequest>,
}

pub async fn get_call(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<CallDetail>, AppError> {
    let db = state.db()?;
    let call = queries::get_call(&db, id)?.ok_or_else(|| AppError::NotFound(format!("call {id}")))?;
    let turns = queries::get_turns(&db, id)?;
    let consultation_requests = queries::get_consultation_requests(&db, id)?;

    Ok(Json(CallDetail {
        call,
        turns,
        consultation_requests,
    }))
}
