use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session control
        .route("/assistant/start", post(handlers::start_session))
        .route("/assistant/stop", post(handlers::stop_session))
        .route("/assistant/message", post(handlers::send_message))
        .route(
            "/assistant/credential/reselect",
            post(handlers::reselect_credential),
        )
        // Host collaborators
        .route("/assistant/location", post(handlers::update_location))
        .route("/assistant/navigation", get(handlers::get_navigation))
        // Queries
        .route("/assistant/status", get(handlers::get_status))
        .route("/assistant/conversation", get(handlers::get_conversation))
        // Request logging, and CORS for browser hosts
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
