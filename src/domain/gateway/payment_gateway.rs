//! The payment gateway orchestrator.
//!
//! Wraps one adapter with the repositories, the event channel, and the route
//! URL builder. Owns command dispatch and the error boundary: provider
//! failures are logged in full but reach the donor only as a fixed safe
//! message.

use std::sync::Arc;

use serde_json::json;
use tracing::error;

use crate::domain::donation::Donation;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::ports::{
    DonationRepository, EventPublisher, GatewayAdapter, GatewayRouteContext, RouteMethodArgs,
    SubscriptionRepository,
};

use super::route_signature::{RouteArgs, RouteSignature, SIGNATURE_PARAM};
use super::routes::RouteUrlBuilder;
use super::{
    handlers, GatewayCommand, GatewayError, GatewayPaymentData, GatewayResponse,
    GatewaySubscriptionData,
};

/// The one message donors see when payment initiation fails, whatever the
/// underlying cause.
pub const DONOR_SAFE_ERROR_MESSAGE: &str =
    "An unexpected error occurred while processing the donation. Please try again or contact a site administrator.";

/// Orchestrates payment and subscription creation for one gateway adapter.
pub struct PaymentGateway {
    adapter: Arc<dyn GatewayAdapter>,
    donations: Arc<dyn DonationRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    events: Arc<dyn EventPublisher>,
    routes: RouteUrlBuilder,
    signing_secret: secrecy::SecretString,
}

impl PaymentGateway {
    pub fn new(
        adapter: Arc<dyn GatewayAdapter>,
        donations: Arc<dyn DonationRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        events: Arc<dyn EventPublisher>,
        routes: RouteUrlBuilder,
        signing_secret: secrecy::SecretString,
    ) -> Self {
        Self {
            adapter,
            donations,
            subscriptions,
            events,
            routes,
            signing_secret,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn GatewayAdapter> {
        &self.adapter
    }

    /// True when the adapter attached a subscription module.
    pub fn supports_subscriptions(&self) -> bool {
        self.adapter.subscription_module().is_some()
    }

    /// Initiates a one-time payment and dispatches the resulting command.
    ///
    /// Adapter errors never propagate: the detail is logged and the donor
    /// gets the fixed safe message. Persistence errors from the handlers do
    /// propagate so the transport can surface a server error.
    pub async fn handle_create_payment(
        &self,
        payment_data: &GatewayPaymentData,
    ) -> Result<GatewayResponse, DomainError> {
        match self.adapter.create_payment(payment_data).await {
            Ok(command) => self.dispatch_payment_command(command, payment_data).await,
            Err(err) => Ok(self.donor_safe_failure(&err, &payment_data.donation)),
        }
    }

    /// Initiates a recurring subscription. Must not be called unless
    /// `supports_subscriptions()` is true.
    pub async fn handle_create_subscription(
        &self,
        payment_data: &GatewayPaymentData,
        subscription_data: &GatewaySubscriptionData,
    ) -> Result<GatewayResponse, DomainError> {
        let Some(module) = self.adapter.subscription_module() else {
            return Err(DomainError::new(
                crate::domain::foundation::ErrorCode::SubscriptionsUnsupported,
                format!("gateway '{}' does not support subscriptions", self.adapter.id()),
            ));
        };

        match module.create_subscription(payment_data, subscription_data).await {
            Ok(command) => {
                self.dispatch_subscription_command(command, payment_data, subscription_data)
                    .await
            }
            Err(err) => Ok(self.donor_safe_failure(&err, &payment_data.donation)),
        }
    }

    /// Dispatches a command returned by the one-time payment path.
    async fn dispatch_payment_command(
        &self,
        command: GatewayCommand,
        payment_data: &GatewayPaymentData,
    ) -> Result<GatewayResponse, DomainError> {
        let donation_id = payment_data.donation.id;
        match command {
            GatewayCommand::PaymentComplete { transaction_id } => {
                handlers::handle_payment_complete(
                    &self.donations,
                    &self.events,
                    donation_id,
                    &transaction_id,
                    &payment_data.success_url,
                )
                .await
            }
            GatewayCommand::PaymentProcessing { transaction_id } => {
                handlers::handle_payment_processing(
                    &self.donations,
                    donation_id,
                    &transaction_id,
                    &payment_data.success_url,
                )
                .await
            }
            GatewayCommand::RedirectOffsite { redirect_url } => {
                Ok(GatewayResponse::redirect(redirect_url))
            }
            GatewayCommand::RespondToBrowser { payload } => Ok(GatewayResponse::json(payload)),
            GatewayCommand::SubscriptionComplete { .. } => Err(DomainError::unsupported_command(
                format!(
                    "gateway '{}' returned SubscriptionComplete from create_payment",
                    self.adapter.id()
                ),
            )),
        }
    }

    /// Dispatches a command returned by the subscription path.
    async fn dispatch_subscription_command(
        &self,
        command: GatewayCommand,
        payment_data: &GatewayPaymentData,
        subscription_data: &GatewaySubscriptionData,
    ) -> Result<GatewayResponse, DomainError> {
        match command {
            GatewayCommand::SubscriptionComplete {
                gateway_subscription_id,
                transaction_id,
            } => {
                handlers::handle_subscription_complete(
                    &self.donations,
                    &self.subscriptions,
                    &self.events,
                    payment_data.donation.id,
                    subscription_data.subscription.id,
                    &gateway_subscription_id,
                    &transaction_id,
                    &payment_data.success_url,
                )
                .await
            }
            other => Err(DomainError::unsupported_command(format!(
                "gateway '{}' returned {} from create_subscription",
                self.adapter.id(),
                other.name()
            ))),
        }
    }

    /// URL for one of the adapter's plain route methods.
    pub fn generate_gateway_route_url(&self, method: &str, args: &RouteArgs) -> String {
        self.routes.route_url(method, args)
    }

    /// URL for one of the adapter's secure route methods, signature embedded.
    pub fn generate_secure_gateway_route_url(&self, method: &str, args: &RouteArgs) -> String {
        self.routes.secure_route_url(method, args, Timestamp::now())
    }

    /// Resolves an inbound callback to the adapter's route method.
    ///
    /// Unknown methods and missing or invalid signatures are rejected before
    /// the adapter sees the request.
    pub async fn resolve_route(
        &self,
        method: &str,
        args: &RouteMethodArgs,
        now: Timestamp,
    ) -> Result<GatewayResponse, DomainError> {
        let is_plain = self.adapter.route_methods().contains(&method);
        let is_secure = self.adapter.secure_route_methods().contains(&method);

        if !is_plain && !is_secure {
            return Err(DomainError::new(
                crate::domain::foundation::ErrorCode::UnknownRouteMethod,
                format!(
                    "gateway '{}' has no route method '{}'",
                    self.adapter.id(),
                    method
                ),
            ));
        }

        if is_secure {
            let nonce = args.get(SIGNATURE_PARAM).map(String::as_str).unwrap_or("");
            let signed_args: RouteArgs = args
                .iter()
                .filter(|(key, _)| key.as_str() != SIGNATURE_PARAM)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            if !RouteSignature::verify(
                self.adapter.id(),
                method,
                &signed_args,
                &self.signing_secret,
                nonce,
                now,
            ) {
                return Err(DomainError::new(
                    crate::domain::foundation::ErrorCode::InvalidSignature,
                    format!("invalid or expired signature for route method '{}'", method),
                ));
            }
        }

        let ctx = GatewayRouteContext {
            donations: Arc::clone(&self.donations),
            subscriptions: Arc::clone(&self.subscriptions),
            events: Arc::clone(&self.events),
        };

        match self.adapter.handle_route_method(&ctx, method, args).await {
            Ok(response) => Ok(response),
            Err(err) => {
                error!(
                    gateway_id = self.adapter.id(),
                    method,
                    error = %err,
                    "gateway route method failed"
                );
                Ok(GatewayResponse::json(
                    json!({ "error": DONOR_SAFE_ERROR_MESSAGE }),
                ))
            }
        }
    }

    /// Logs the full adapter error and builds the donor-facing response.
    fn donor_safe_failure(&self, err: &GatewayError, donation: &Donation) -> GatewayResponse {
        error!(
            gateway_id = self.adapter.id(),
            donation_id = donation.id.as_i64(),
            error = %err,
            "gateway payment initiation failed"
        );
        GatewayResponse::json(json!({ "error": DONOR_SAFE_ERROR_MESSAGE }))
    }
}
