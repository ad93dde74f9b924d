//! Gateway-boundary error type.
//!
//! Raised by adapters when the provider rejects or errors. The orchestrator
//! catches it, logs the detail, and replaces it with a fixed donor-safe
//! message; the detail never reaches the browser.

use thiserror::Error;

/// An error raised inside a gateway adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The provider rejected the request (declined card, bad credentials,
    /// malformed provider response).
    #[error("gateway '{gateway_id}' error: {message}")]
    Provider { gateway_id: String, message: String },

    /// The provider could not be reached.
    #[error("gateway '{gateway_id}' unreachable: {message}")]
    Unreachable { gateway_id: String, message: String },
}

impl GatewayError {
    pub fn provider(gateway_id: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Provider {
            gateway_id: gateway_id.into(),
            message: message.into(),
        }
    }

    pub fn unreachable(gateway_id: impl Into<String>, message: impl Into<String>) -> Self {
        GatewayError::Unreachable {
            gateway_id: gateway_id.into(),
            message: message.into(),
        }
    }

    pub fn gateway_id(&self) -> &str {
        match self {
            GatewayError::Provider { gateway_id, .. }
            | GatewayError::Unreachable { gateway_id, .. } => gateway_id,
        }
    }
}
