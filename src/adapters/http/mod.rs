//! HTTP adapters (axum).

mod handlers;
mod routes;

pub use handlers::{GatewayAppState, GatewayRegistry};
pub use routes::gateway_routes;
