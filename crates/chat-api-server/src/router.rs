use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

use crate::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/api/chat", post(handlers::chat::chat_handler))
        .route("/api/chat/roi", post(handlers::roi::calculate_roi_handler))
        .route(
            "/api/chat/history/{conversation_id}",
            get(handlers::chat::history_handler).delete(handlers::chat::clear_handler),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .merge(chat_routes)
        .with_state(state)
        // CORS
        .layer(CorsLayer::permissive())
        // Tracing
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
}
