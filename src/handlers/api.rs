use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use std::sync::Arc;

use crate::state::AppState;

/// Health check with live transport counters
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "OK",
        "version": env!("CARGO_PKG_VERSION"),
        "pod_id": state.config.pod_id,
        "sessions": state.streaming.session_count(),
        "metrics": state.streaming.metrics().snapshot(),
    }))
}
