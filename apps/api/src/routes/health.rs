use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// Liveness/readiness probe. Pings the pool with a trivial query so a wedged
/// connection shows up as `degraded` rather than a bare 500 from deeper in
/// the stack.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let db_ok = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();

    Json(json!({
        "ok": true,
        "data": {
            "status": if db_ok { "healthy" } else { "degraded" },
            "db": db_ok,
            "ai_available": state.llm.is_available(),
        }
    }))
}
