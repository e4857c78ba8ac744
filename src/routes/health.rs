use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

/// Liveness plus a store round trip
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let store_ok = state
        .db
        .ping()
        .await
        .map_err(|e| tracing::error!(error = ?e, "Store ping failed"))
        .is_ok();

    let backend = if state.config.uses_memory_store() {
        "memory"
    } else {
        "postgres"
    };

    Json(json!({
        "status": if store_ok { "healthy" } else { "unhealthy" },
        "database": if store_ok { "connected" } else { "disconnected" },
        "backend": backend,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
