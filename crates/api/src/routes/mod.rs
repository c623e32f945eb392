//! HTTP routes
//!
//! Only the relay's own endpoints live here. Recipe, user and session
//! handlers are mounted by the application and publish through
//! [`AppState::relay`](crate::state::AppState).

pub mod health;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::{error::ApiError, state::AppState, websocket::upgrade_gateway};

/// Build the router. WebSocket upgrades on any path are diverted by the
/// gateway middleware before routing.
pub fn create_router(state: AppState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness));

    Router::new()
        .merge(health_routes)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), upgrade_gateway))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}
