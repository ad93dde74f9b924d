//! Gateway command protocol.
//!
//! A provider adapter finishes `create_payment` / `create_subscription` by
//! returning exactly one of these variants. The orchestrator dispatches each
//! variant to its handler; the set is closed, so dispatch is an exhaustive
//! match and a new variant cannot be added without the compiler pointing at
//! every dispatch site.

use serde_json::Value as JsonValue;

/// Result of asking a gateway adapter to act. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum GatewayCommand {
    /// The gateway captured the funds synchronously.
    PaymentComplete { transaction_id: String },

    /// The gateway accepted the payment; settlement will be confirmed later
    /// (typically by webhook).
    PaymentProcessing { transaction_id: String },

    /// The donor must be sent to the provider's site to pay.
    RedirectOffsite { redirect_url: String },

    /// The adapter has a payload the browser needs verbatim (onsite JS flows).
    RespondToBrowser { payload: JsonValue },

    /// The gateway established a recurring subscription.
    SubscriptionComplete {
        gateway_subscription_id: String,
        transaction_id: String,
    },
}

impl GatewayCommand {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            GatewayCommand::PaymentComplete { .. } => "PaymentComplete",
            GatewayCommand::PaymentProcessing { .. } => "PaymentProcessing",
            GatewayCommand::RedirectOffsite { .. } => "RedirectOffsite",
            GatewayCommand::RespondToBrowser { .. } => "RespondToBrowser",
            GatewayCommand::SubscriptionComplete { .. } => "SubscriptionComplete",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn names_identify_variants() {
        let commands = [
            GatewayCommand::PaymentComplete {
                transaction_id: "tx_1".into(),
            },
            GatewayCommand::PaymentProcessing {
                transaction_id: "tx_2".into(),
            },
            GatewayCommand::RedirectOffsite {
                redirect_url: "https://pay.example.com".into(),
            },
            GatewayCommand::RespondToBrowser {
                payload: json!({"ok": true}),
            },
            GatewayCommand::SubscriptionComplete {
                gateway_subscription_id: "sub_1".into(),
                transaction_id: "tx_3".into(),
            },
        ];
        let names: Vec<_> = commands.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "PaymentComplete",
                "PaymentProcessing",
                "RedirectOffsite",
                "RespondToBrowser",
                "SubscriptionComplete"
            ]
        );
    }
}
