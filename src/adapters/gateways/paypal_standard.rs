//! PayPal Standard gateway adapter.
//!
//! Offsite flow: `create_payment` redirects the donor to PayPal's hosted
//! payment page; the outcome arrives later through the IPN webhook and the
//! signed browser-return routes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::donation::DonationStatus;
use crate::domain::foundation::{DonationId, Timestamp};
use crate::domain::gateway::{
    GatewayCommand, GatewayError, GatewayPaymentData, GatewayResponse, RouteUrlBuilder,
};
use crate::ports::{GatewayAdapter, GatewayRouteContext, RouteMethodArgs};

pub const PAYPAL_STANDARD_ID: &str = "paypal-standard";

const LIVE_PAYMENT_URL: &str = "https://www.paypal.com/cgi-bin/webscr";
const SANDBOX_PAYMENT_URL: &str = "https://www.sandbox.paypal.com/cgi-bin/webscr";
const LIVE_IPN_URL: &str = "https://ipnpb.paypal.com/cgi-bin/webscr";
const SANDBOX_IPN_URL: &str = "https://ipnpb.sandbox.paypal.com/cgi-bin/webscr";

/// Settings for the PayPal Standard integration.
#[derive(Debug, Clone)]
pub struct PayPalStandardConfig {
    /// The merchant's PayPal account email.
    pub business_email: String,

    /// Use the sandbox endpoints.
    pub sandbox: bool,

    /// Where successful donors land (receipt page).
    pub receipt_url: String,

    /// Where failed or cancelled donors land.
    pub failed_url: String,
}

pub struct PayPalStandardGateway {
    config: PayPalStandardConfig,
    routes: RouteUrlBuilder,
    http: reqwest::Client,
}

impl PayPalStandardGateway {
    pub fn new(config: PayPalStandardConfig, routes: RouteUrlBuilder) -> Self {
        Self {
            config,
            routes,
            http: reqwest::Client::new(),
        }
    }

    fn payment_url(&self) -> &'static str {
        if self.config.sandbox {
            SANDBOX_PAYMENT_URL
        } else {
            LIVE_PAYMENT_URL
        }
    }

    fn ipn_url(&self) -> &'static str {
        if self.config.sandbox {
            SANDBOX_IPN_URL
        } else {
            LIVE_IPN_URL
        }
    }

    /// Posts the notification back to PayPal for verification.
    async fn verify_ipn(&self, args: &RouteMethodArgs) -> Result<bool, GatewayError> {
        // PayPal requires the original fields, prefixed with the validate
        // command. BTreeMap keeps the body deterministic for tests.
        let mut form: BTreeMap<&str, &str> = BTreeMap::new();
        form.insert("cmd", "_notify-validate");
        for (key, value) in args {
            form.insert(key.as_str(), value.as_str());
        }

        let response = self
            .http
            .post(self.ipn_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| GatewayError::unreachable(PAYPAL_STANDARD_ID, e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::unreachable(PAYPAL_STANDARD_ID, e.to_string()))?;

        Ok(body.trim() == "VERIFIED")
    }

    fn donation_id_from_args(args: &RouteMethodArgs, key: &str) -> Result<DonationId, GatewayError> {
        args.get(key)
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(DonationId::new)
            .ok_or_else(|| {
                GatewayError::provider(
                    PAYPAL_STANDARD_ID,
                    format!("missing or malformed '{}' argument", key),
                )
            })
    }

    async fn handle_ipn_notification(
        &self,
        ctx: &GatewayRouteContext,
        args: &RouteMethodArgs,
    ) -> Result<GatewayResponse, GatewayError> {
        if !self.verify_ipn(args).await? {
            warn!("discarding IPN that failed postback verification");
            return Ok(GatewayResponse::json(serde_json::json!({ "received": true })));
        }

        let donation_id = Self::donation_id_from_args(args, "custom")?;
        let txn_id = args.get("txn_id").map(String::as_str).unwrap_or("");
        let payment_status = args.get("payment_status").map(String::as_str).unwrap_or("");

        let result = match payment_status {
            "Completed" => ctx
                .donations
                .complete_payment(donation_id, txn_id)
                .await
                .map(|_| ()),
            "Refunded" | "Reversed" => ctx
                .donations
                .update_status(donation_id, DonationStatus::Refunded)
                .await,
            "Failed" | "Denied" | "Expired" | "Voided" => ctx
                .donations
                .update_status(donation_id, DonationStatus::Failed)
                .await,
            other => {
                info!(payment_status = other, "ignoring unhandled IPN payment status");
                Ok(())
            }
        };

        result.map_err(|e| GatewayError::provider(PAYPAL_STANDARD_ID, e.to_string()))?;
        Ok(GatewayResponse::json(serde_json::json!({ "received": true })))
    }

    /// Browser return after a successful PayPal payment. The IPN is the
    /// source of truth for completion; the return only promotes a still
    /// pending donation to processing.
    async fn handle_success_payment_return(
        &self,
        ctx: &GatewayRouteContext,
        args: &RouteMethodArgs,
    ) -> Result<GatewayResponse, GatewayError> {
        let donation_id = Self::donation_id_from_args(args, "donation-id")?;
        ctx.donations
            .mark_processing(donation_id, None)
            .await
            .map_err(|e| GatewayError::provider(PAYPAL_STANDARD_ID, e.to_string()))?;
        Ok(GatewayResponse::redirect(&self.config.receipt_url))
    }

    async fn handle_failed_payment_return(
        &self,
        ctx: &GatewayRouteContext,
        args: &RouteMethodArgs,
    ) -> Result<GatewayResponse, GatewayError> {
        let donation_id = Self::donation_id_from_args(args, "donation-id")?;
        ctx.donations
            .update_status(donation_id, DonationStatus::Failed)
            .await
            .map_err(|e| GatewayError::provider(PAYPAL_STANDARD_ID, e.to_string()))?;
        Ok(GatewayResponse::redirect(&self.config.failed_url))
    }
}

#[async_trait]
impl GatewayAdapter for PayPalStandardGateway {
    fn id(&self) -> &str {
        PAYPAL_STANDARD_ID
    }

    fn name(&self) -> &str {
        "PayPal Standard"
    }

    fn payment_method_label(&self) -> &str {
        "PayPal"
    }

    async fn create_payment(
        &self,
        payment_data: &GatewayPaymentData,
    ) -> Result<GatewayCommand, GatewayError> {
        let donation = &payment_data.donation;
        let donation_id = donation.id.as_i64().to_string();
        let return_args = vec![("donation-id".to_string(), donation_id.clone())];

        let return_url = self.routes.secure_route_url(
            "handleSuccessPaymentReturn",
            &return_args,
            Timestamp::now(),
        );
        let cancel_url = self.routes.secure_route_url(
            "handleFailedPaymentReturn",
            &return_args,
            Timestamp::now(),
        );
        let notify_url = self.routes.route_url("handleIpnNotification", &vec![]);

        let params = vec![
            ("cmd", "_donations".to_string()),
            ("business", self.config.business_email.clone()),
            ("item_name", format!("Donation #{}", donation_id)),
            ("amount", payment_data.amount.format_major()),
            ("currency_code", payment_data.amount.currency().to_string()),
            ("first_name", payment_data.first_name.clone()),
            ("last_name", payment_data.last_name.clone()),
            ("email", payment_data.email.clone()),
            ("custom", donation_id),
            ("return", return_url),
            ("cancel_return", cancel_url),
            ("notify_url", notify_url),
            ("no_shipping", "1".to_string()),
            ("charset", "utf-8".to_string()),
        ];

        let query = params
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencode(value)))
            .collect::<Vec<_>>()
            .join("&");

        Ok(GatewayCommand::RedirectOffsite {
            redirect_url: format!("{}?{}", self.payment_url(), query),
        })
    }

    fn route_methods(&self) -> Vec<&'static str> {
        vec!["handleIpnNotification"]
    }

    fn secure_route_methods(&self) -> Vec<&'static str> {
        vec!["handleSuccessPaymentReturn", "handleFailedPaymentReturn"]
    }

    async fn handle_route_method(
        &self,
        ctx: &GatewayRouteContext,
        method: &str,
        args: &RouteMethodArgs,
    ) -> Result<GatewayResponse, GatewayError> {
        match method {
            "handleIpnNotification" => self.handle_ipn_notification(ctx, args).await,
            "handleSuccessPaymentReturn" => self.handle_success_payment_return(ctx, args).await,
            "handleFailedPaymentReturn" => self.handle_failed_payment_return(ctx, args).await,
            other => Err(GatewayError::provider(
                PAYPAL_STANDARD_ID,
                format!("route method '{}' declared but not implemented", other),
            )),
        }
    }
}

fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
