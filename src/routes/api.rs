use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::speakings;
use crate::state::AppState;
use std::sync::Arc;

/// Create the speaking lifecycle router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/v1/speakings",
            post(speakings::create_speaking).get(speakings::list_speakings),
        )
        .route(
            "/v1/speakings/{id}",
            get(speakings::get_speaking).delete(speakings::delete_speaking),
        )
        .route("/v1/speakings/{id}/say", post(speakings::say))
        .route("/v1/speakings/{id}/flush", post(speakings::flush))
        .route("/v1/speakings/{id}/finish", post(speakings::finish))
        .route("/v1/speakings/{id}/stop", post(speakings::stop))
        .layer(TraceLayer::new_for_http())
}
