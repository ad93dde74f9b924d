//! Payment gateway adapter port.
//!
//! Each provider integration implements `GatewayAdapter`; recurring support is
//! a separate `SubscriptionModule` the adapter may or may not attach. Adapters
//! return `GatewayCommand` values and never touch repositories directly —
//! route methods get a scoped context instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::gateway::{
    GatewayCommand, GatewayError, GatewayPaymentData, GatewayResponse, GatewaySubscriptionData,
};
use crate::ports::{DonationRepository, EventPublisher, SubscriptionRepository};

/// Repositories and the event channel, handed to route methods.
///
/// Route methods run outside the orchestrator's dispatch (webhooks, browser
/// returns) but still mutate financial state, so they get the same ports the
/// command handlers use.
#[derive(Clone)]
pub struct GatewayRouteContext {
    pub donations: Arc<dyn DonationRepository>,
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub events: Arc<dyn EventPublisher>,
}

/// Query arguments of a route invocation, decoded.
pub type RouteMethodArgs = HashMap<String, String>;

/// A provider integration.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    /// Stable identifier used in callback URLs and persisted on donations.
    fn id(&self) -> &str;

    /// Human-readable gateway name.
    fn name(&self) -> &str;

    /// Label shown next to the payment option, e.g. "Credit Card".
    fn payment_method_label(&self) -> &str;

    /// Initiates a one-time payment and reports the outcome as a command.
    async fn create_payment(
        &self,
        payment_data: &GatewayPaymentData,
    ) -> Result<GatewayCommand, GatewayError>;

    /// Recurring support, when the adapter provides it.
    fn subscription_module(&self) -> Option<&dyn SubscriptionModule> {
        None
    }

    /// Route methods callable without a signature (e.g. webhook endpoints
    /// where the provider authenticates the payload itself).
    fn route_methods(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Route methods that require a valid route signature.
    fn secure_route_methods(&self) -> Vec<&'static str> {
        Vec::new()
    }

    /// Executes a declared route method. Called only with methods listed in
    /// `route_methods` / `secure_route_methods`, after signature checks.
    async fn handle_route_method(
        &self,
        _ctx: &GatewayRouteContext,
        method: &str,
        _args: &RouteMethodArgs,
    ) -> Result<GatewayResponse, GatewayError> {
        Err(GatewayError::provider(
            self.id(),
            format!("route method '{}' declared but not implemented", method),
        ))
    }
}

/// Recurring-payment extension of a gateway adapter.
#[async_trait]
pub trait SubscriptionModule: Send + Sync {
    /// Initiates the subscription and its first payment.
    async fn create_subscription(
        &self,
        payment_data: &GatewayPaymentData,
        subscription_data: &GatewaySubscriptionData,
    ) -> Result<GatewayCommand, GatewayError>;
}
