use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let database = state
        .db()
        .and_then(|db| Ok(db.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?))
        .is_ok();

    Json(serde_json::json!({
        "status": if database { "ok" } else { "degraded" },
        "service": "receptionist",
        "practice": state.receptionist.profile().info.name,
        "database": database,
    }))
}
