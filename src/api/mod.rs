//! HTTP API for chimed
//!
//! Router wiring: the poll endpoint, health and the SSE stream are public;
//! the mutating endpoints sit behind the shared-secret gate.

pub mod auth;
pub mod handlers;
pub mod sse;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::SharedState;

/// Shared application context passed to all handlers
#[derive(Clone)]
pub struct AppContext {
    pub state: Arc<SharedState>,
}

/// Build the application router
pub fn build_router(ctx: AppContext) -> Router {
    // Protected routes (require the shared secret)
    let protected = Router::new()
        .route("/sounds/trigger", post(handlers::trigger_sound))
        .route("/sounds/cancel", post(handlers::cancel_sounds))
        .layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::auth_middleware,
        ));

    // Public routes
    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/sounds/poll", get(handlers::poll_sounds))
        .route("/sounds/queue", get(handlers::get_queue))
        .route("/events", get(sse::event_stream));

    Router::new()
        .merge(protected)
        .merge(public)
        .with_state(ctx)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
