use axum::Router;
use axum::routing::get;

use crate::state::AppState;

pub mod chat;
pub mod health;
pub mod tools;

/// Builds the application router. Shared between `main` and the tests.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/debug/tools", get(tools::list_tools))
        .route("/chat_stream/{message}", get(chat::chat_stream))
        .with_state(state)
}
