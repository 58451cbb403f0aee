//! API routes for the relay server
//!
//! Thin surface over the sync engine. Request authentication is handled
//! by the deployment's edge proxy and is not part of this service.

pub mod connections;
pub mod failures;
pub mod health;
pub mod sync;
pub mod webhooks;

use crate::core::AppState;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // Webhook receivers: ack immediately, process asynchronously
    let webhook = Router::new()
        .route(
            "/api/webhooks/{connection_id}/orders",
            post(webhooks::receive_order),
        )
        .route(
            "/api/webhooks/{connection_id}/refunds",
            post(webhooks::receive_refund),
        );

    // Manual sync triggers (same code paths as the timers)
    let sync = Router::new()
        .route("/api/sync/run", post(sync::run_reconciliation))
        .route("/api/sync/orders/pull", post(sync::pull_orders));

    // Failure inspection and manual override
    let failures = Router::new()
        .route("/api/failures", get(failures::list_failures))
        .route("/api/failures/{id}/resolve", post(failures::resolve_failure));

    // Connection registry (creation belongs to the external setup flow;
    // these routes are the minimal management surface)
    let connections = Router::new()
        .route(
            "/api/connections",
            get(connections::list_connections).post(connections::create_connection),
        )
        .route(
            "/api/connections/{id}/enabled",
            post(connections::set_enabled),
        );

    Router::new()
        .route("/health", get(health::health_check))
        .merge(webhook)
        .merge(sync)
        .merge(failures)
        .merge(connections)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
