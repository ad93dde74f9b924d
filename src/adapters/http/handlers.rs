//! Axum handlers for gateway callback routes.
//!
//! One dynamic endpoint resolves `/gateway/:gateway_id/:method` to the
//! registered orchestrator, which enforces route-method declarations and
//! signature checks before the adapter runs.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Form, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::gateway::{GatewayResponse, PaymentGateway};

/// The registered payment gateways, keyed by gateway id.
#[derive(Clone, Default)]
pub struct GatewayRegistry {
    gateways: HashMap<String, Arc<PaymentGateway>>,
}

impl GatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, gateway: Arc<PaymentGateway>) {
        self.gateways
            .insert(gateway.adapter().id().to_string(), gateway);
    }

    pub fn get(&self, gateway_id: &str) -> Option<&Arc<PaymentGateway>> {
        self.gateways.get(gateway_id)
    }
}

#[derive(Clone)]
pub struct GatewayAppState {
    pub registry: Arc<GatewayRegistry>,
}

/// GET callback (browser returns, PDT-style notifications).
pub async fn handle_gateway_route_get(
    State(state): State<GatewayAppState>,
    Path((gateway_id, method)): Path<(String, String)>,
    Query(args): Query<HashMap<String, String>>,
) -> Response {
    run_route(&state, &gateway_id, &method, args).await
}

/// POST callback (webhook notifications). Form fields and query arguments are
/// merged; form fields win on conflict.
pub async fn handle_gateway_route_post(
    State(state): State<GatewayAppState>,
    Path((gateway_id, method)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let mut args = query;
    args.extend(form);
    run_route(&state, &gateway_id, &method, args).await
}

async fn run_route(
    state: &GatewayAppState,
    gateway_id: &str,
    method: &str,
    args: HashMap<String, String>,
) -> Response {
    let Some(gateway) = state.registry.get(gateway_id) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("unknown gateway '{}'", gateway_id),
        );
    };

    match gateway.resolve_route(method, &args, Timestamp::now()).await {
        Ok(response) => gateway_response(response),
        Err(err) => domain_error_response(err),
    }
}

/// Maps the dispatch response to the wire.
fn gateway_response(response: GatewayResponse) -> Response {
    match response {
        GatewayResponse::Redirect { url } => Redirect::to(&url).into_response(),
        GatewayResponse::Json { payload } => Json(payload).into_response(),
    }
}

fn domain_error_response(err: DomainError) -> Response {
    let status = match err.code {
        ErrorCode::UnknownRouteMethod | ErrorCode::DonationNotFound
        | ErrorCode::SubscriptionNotFound => StatusCode::NOT_FOUND,
        ErrorCode::InvalidSignature => StatusCode::FORBIDDEN,
        ErrorCode::ValidationFailed | ErrorCode::DonorNotFound => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!(error = %err, "gateway route failed");
    }
    error_response(status, err.message)
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
