use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::AppState;

/// - `GET /` health and bot tag
/// - `GET /status` live server status
/// - `GET /whitelist` whitelist entries
/// - `POST /chat` chat/join/leave events from the Minecraft side
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/status", get(handlers::status))
        .route("/whitelist", get(handlers::whitelist))
        .route("/chat", post(handlers::chat))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
