//! Route definitions for the Orkut call API.
//!
//! HTTP routes live under `/api`; the realtime socket is mounted at `/ws`.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::state::AppState;

/// Build the complete Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(call_routes())
        .merge(presence_routes())
        .merge(health_routes());

    let ws_routes = Router::new().route("/ws", get(handlers::ws::ws_upgrade));

    let cors = middleware::cors::build_cors_layer(&state.config.server.cors);

    Router::new()
        .nest("/api", api_routes)
        .merge(ws_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(middleware::logging::request_logging))
        .with_state(state)
}

/// Call invitation fallback
fn call_routes() -> Router<AppState> {
    Router::new().route(
        "/call-notification",
        post(handlers::call_notification::notify_call)
            .put(handlers::call_notification::respond_to_call),
    )
}

/// Persisted presence flags
fn presence_routes() -> Router<AppState> {
    Router::new().route(
        "/presence",
        get(handlers::presence::list_online).post(handlers::presence::update_presence),
    )
}

/// Health check (no auth required)
fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
