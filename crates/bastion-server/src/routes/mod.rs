//! Route configuration for the Bastion server.

mod admin;
mod auth;
mod posts;
mod users;

use crate::middleware::auth::AuthLayer;
use crate::middleware::authz::RegistryError;
use crate::middleware::correlation::CorrelationLayer;
use crate::state::AppState;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde_json::json;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer};

/// Create the main application router.
///
/// Fails if any gate names a permission the table does not define.
pub fn create_router(
    state: AppState,
    request_timeout: Duration,
) -> Result<Router, RegistryError> {
    let api = Router::new()
        .nest("/posts", posts::router(&state)?)
        .nest("/users", users::router(&state)?)
        .nest("/admin", admin::router(&state))
        .nest("/auth", auth::authenticated_routes())
        .route_layer(AuthLayer::new(state.decoder.clone(), state.directory.clone()))
        // Added after the auth gate, so it does not cover them.
        .merge(auth::public_routes());

    let common_middleware = ServiceBuilder::new()
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::new(request_timeout));
    let correlation = CorrelationLayer::new(state.logging.clone());

    Ok(Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .fallback(fallback_handler)
        .layer(common_middleware)
        // Outermost, so the correlation span covers everything below.
        .layer(correlation)
        .with_state(state))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn fallback_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Route not found",
            "code": "NOT_FOUND"
        })),
    )
}
