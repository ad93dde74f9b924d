//! Money value object.
//!
//! Amounts are stored in minor currency units (cents for USD) to keep
//! arithmetic exact. The currency code is a three-letter ISO 4217 code.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::ValidationError;

/// Currencies whose minor unit is the whole unit (no decimal places).
static ZERO_DECIMAL_CURRENCIES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["BIF", "CLP", "DJF", "GNF", "JPY", "KMF", "KRW", "MGA", "PYG", "RWF", "VND", "VUV", "XAF",
        "XOF", "XPF"]
        .into_iter()
        .collect()
});

/// Immutable currency amount in minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: i64,
    currency: String,
}

impl Money {
    /// Creates a money value, validating the amount and currency code.
    ///
    /// The amount is in minor units and must not be negative; refunds are a
    /// status transition, not a negative amount. The currency must be a
    /// three-letter uppercase code.
    pub fn new(amount: i64, currency: impl Into<String>) -> Result<Self, ValidationError> {
        let currency = currency.into();

        if amount < 0 {
            return Err(ValidationError::invalid_format(
                "amount",
                format!("amount must not be negative, got {}", amount),
            ));
        }

        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ValidationError::invalid_format(
                "currency",
                format!("'{}' is not a three-letter ISO currency code", currency),
            ));
        }

        Ok(Self { amount, currency })
    }

    /// Returns the amount in minor units.
    pub fn amount_minor(&self) -> i64 {
        self.amount
    }

    /// Returns the ISO currency code.
    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Number of decimal places the currency's minor unit carries.
    pub fn decimals(&self) -> u32 {
        if ZERO_DECIMAL_CURRENCIES.contains(self.currency.as_str()) {
            0
        } else {
            2
        }
    }

    /// Formats the amount in major units, e.g. `5000` USD -> `"50.00"`.
    ///
    /// Offsite gateways (PayPal Standard) take major-unit amounts.
    pub fn format_major(&self) -> String {
        match self.decimals() {
            0 => self.amount.to_string(),
            d => {
                let divisor = 10_i64.pow(d);
                format!(
                    "{}.{:0width$}",
                    self.amount / divisor,
                    self.amount % divisor,
                    width = d as usize
                )
            }
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.format_major(), self.currency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_accepts_valid_amount_and_currency() {
        let money = Money::new(5000, "USD").unwrap();
        assert_eq!(money.amount_minor(), 5000);
        assert_eq!(money.currency(), "USD");
    }

    #[test]
    fn new_rejects_negative_amount() {
        assert!(Money::new(-1, "USD").is_err());
    }

    #[test]
    fn new_rejects_malformed_currency() {
        assert!(Money::new(100, "usd").is_err());
        assert!(Money::new(100, "US").is_err());
        assert!(Money::new(100, "DOLLARS").is_err());
        assert!(Money::new(100, "U5D").is_err());
    }

    #[test]
    fn format_major_two_decimal_currency() {
        assert_eq!(Money::new(5000, "USD").unwrap().format_major(), "50.00");
        assert_eq!(Money::new(5, "EUR").unwrap().format_major(), "0.05");
        assert_eq!(Money::new(1999, "CAD").unwrap().format_major(), "19.99");
    }

    #[test]
    fn format_major_zero_decimal_currency() {
        assert_eq!(Money::new(5000, "JPY").unwrap().format_major(), "5000");
    }

    #[test]
    fn display_includes_currency() {
        assert_eq!(Money::new(5000, "USD").unwrap().to_string(), "50.00 USD");
    }

    proptest! {
        #[test]
        fn valid_amounts_always_construct(amount in 0_i64..=10_000_000_000) {
            let money = Money::new(amount, "USD").unwrap();
            prop_assert_eq!(money.amount_minor(), amount);
        }

        #[test]
        fn format_major_round_trips_minor_amount(amount in 0_i64..=10_000_000_000) {
            let money = Money::new(amount, "USD").unwrap();
            let formatted = money.format_major();
            let (whole, frac) = formatted.split_once('.').unwrap();
            let back: i64 = whole.parse::<i64>().unwrap() * 100 + frac.parse::<i64>().unwrap();
            prop_assert_eq!(back, amount);
        }
    }
}
