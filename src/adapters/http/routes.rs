//! Axum router for gateway callbacks.

use axum::routing::get;
use axum::Router;

use super::handlers::{handle_gateway_route_get, handle_gateway_route_post, GatewayAppState};

/// Router exposing `/gateway/:gateway_id/:method` for browser returns (GET)
/// and webhook notifications (POST).
pub fn gateway_routes() -> Router<GatewayAppState> {
    Router::new().route(
        "/gateway/:gateway_id/:method",
        get(handle_gateway_route_get).post(handle_gateway_route_post),
    )
}
