use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let store_ok = state.store.health_check().await;
    let cache_enabled = state.cache.is_enabled();
    let redis_ok = cache_enabled && state.cache.health_check().await;

    // A disabled cache is a configuration choice, not a degradation.
    let healthy = store_ok && (!cache_enabled || redis_ok);
    let status = if healthy { "healthy" } else { "degraded" };
    Json(json!({
        "status": status,
        "store": store_ok,
        "redis": redis_ok,
        "timestamp": chrono::Utc::now(),
    }))
}
