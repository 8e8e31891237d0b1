//! HTTP API routes for portal-server

pub mod alerts;
pub mod auth;
pub mod boxes;
pub mod clients;
pub mod export;
pub mod health;
pub mod invoices;
pub mod packages;
pub mod shipments;
pub mod stripe_webhook;
pub mod users;

use axum::Router;
use axum::routing::{get, post};
use shared::error::AppError;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router(state: &AppState) -> Router<AppState> {
    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(auth::router(state))
        .merge(users::router())
        .merge(clients::router())
        .merge(packages::router())
        .merge(boxes::router())
        .merge(shipments::router())
        .merge(invoices::router())
        .merge(alerts::router())
        .merge(export::router())
        .merge(webhook)
}

/// Create the combined router with middleware and state
pub fn create_router(state: AppState) -> Router {
    build_router(&state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
