//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::donation::DonationMode;

use super::error::ValidationError;

/// Payment configuration: route signing, default mode, donor landing pages,
/// and the PayPal Standard account.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// HMAC key for route signatures
    pub route_signature_secret: SecretString,

    /// Route signature lifetime in seconds
    #[serde(default = "default_signature_ttl")]
    pub signature_ttl_secs: u64,

    /// Default donation mode for new donations
    #[serde(default = "default_mode")]
    pub mode: DonationMode,

    /// Where successful donors land
    pub receipt_page_url: String,

    /// Where failed or cancelled donors land
    pub failed_page_url: String,

    /// PayPal merchant account email (enables the PayPal Standard gateway)
    pub paypal_business_email: Option<String>,

    /// Use PayPal sandbox endpoints
    #[serde(default)]
    pub paypal_sandbox: bool,
}

impl PaymentConfig {
    pub fn is_test_mode(&self) -> bool {
        self.mode == DonationMode::Test
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.route_signature_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("ROUTE_SIGNATURE_SECRET"));
        }
        if self.route_signature_secret.expose_secret().len() < 32 {
            return Err(ValidationError::RouteSignatureSecretTooShort);
        }
        if !(60..=86_400).contains(&self.signature_ttl_secs) {
            return Err(ValidationError::InvalidSignatureTtl);
        }
        if self.receipt_page_url.is_empty() {
            return Err(ValidationError::MissingRequired("RECEIPT_PAGE_URL"));
        }
        if self.failed_page_url.is_empty() {
            return Err(ValidationError::MissingRequired("FAILED_PAGE_URL"));
        }
        Ok(())
    }
}

fn default_signature_ttl() -> u64 {
    3600
}

fn default_mode() -> DonationMode {
    DonationMode::Test
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PaymentConfig {
        PaymentConfig {
            route_signature_secret: SecretString::new(
                "0123456789abcdef0123456789abcdef".to_string(),
            ),
            signature_ttl_secs: 3600,
            mode: DonationMode::Test,
            receipt_page_url: "https://donate.example.org/receipt".to_string(),
            failed_page_url: "https://donate.example.org/failed".to_string(),
            paypal_business_email: None,
            paypal_sandbox: false,
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn short_secret_fails_validation() {
        let mut config = valid();
        config.route_signature_secret = SecretString::new("short".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn out_of_range_ttl_fails_validation() {
        let mut config = valid();
        config.signature_ttl_secs = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_receipt_url_fails_validation() {
        let mut config = valid();
        config.receipt_page_url = String::new();
        assert!(config.validate().is_err());
    }
}
