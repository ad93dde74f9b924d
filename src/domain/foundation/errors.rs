//! Error types for the domain layer.
//!
//! Validation failures are cheap, synchronous, and developer-facing; they are
//! raised before any transaction opens and surfaced unchanged. Everything else
//! is a `DomainError` with a code that callers can branch on.

use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors raised while validating donation or subscription input.
///
/// These never reach donors; they indicate a caller passed an incomplete or
/// malformed record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{field}' is required")]
    MissingField { field: String },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("Invalid donor id {donor_id}, donor does not exist")]
    DonorNotFound { donor_id: i64 },
}

impl ValidationError {
    /// Creates a missing-required-field error.
    pub fn missing(field: impl Into<String>) -> Self {
        ValidationError::MissingField {
            field: field.into(),
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors (pre-transaction)
    ValidationFailed,
    DonorNotFound,

    // Not found errors
    DonationNotFound,
    SubscriptionNotFound,

    // Persistence errors (transaction rolled back)
    PersistenceFailed,
    DatabaseError,

    // Gateway boundary errors
    GatewayError,
    SubscriptionsUnsupported,
    UnsupportedCommand,
    InvalidSignature,
    UnknownRouteMethod,

    // Infrastructure errors
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::DonorNotFound => "DONOR_NOT_FOUND",
            ErrorCode::DonationNotFound => "DONATION_NOT_FOUND",
            ErrorCode::SubscriptionNotFound => "SUBSCRIPTION_NOT_FOUND",
            ErrorCode::PersistenceFailed => "PERSISTENCE_FAILED",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::GatewayError => "GATEWAY_ERROR",
            ErrorCode::SubscriptionsUnsupported => "SUBSCRIPTIONS_UNSUPPORTED",
            ErrorCode::UnsupportedCommand => "UNSUPPORTED_COMMAND",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::UnknownRouteMethod => "UNKNOWN_ROUTE_METHOD",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code and message.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates a persistence error for a rolled-back transaction.
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PersistenceFailed, message)
    }

    /// Creates a database read error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Creates an unsupported-command error.
    ///
    /// Dispatch received a command variant outside the set its path handles.
    /// This is a programming error in a gateway adapter, never retried.
    pub fn unsupported_command(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::UnsupportedCommand, message)
    }

    /// Returns true if this error indicates a caller-side validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ValidationFailed | ErrorCode::DonorNotFound
        )
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let code = match err {
            ValidationError::DonorNotFound { .. } => ErrorCode::DonorNotFound,
            _ => ErrorCode::ValidationFailed,
        };
        DomainError::new(code, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_field_displays_field_name() {
        let err = ValidationError::missing("email");
        assert_eq!(err.to_string(), "'email' is required");
    }

    #[test]
    fn invalid_format_displays_reason() {
        let err = ValidationError::invalid_format("currency", "not a three-letter code");
        assert_eq!(
            err.to_string(),
            "Field 'currency' has invalid format: not a three-letter code"
        );
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::persistence("Failed creating a donation");
        assert_eq!(
            err.to_string(),
            "[PERSISTENCE_FAILED] Failed creating a donation"
        );
    }

    #[test]
    fn validation_error_converts_with_matching_code() {
        let err: DomainError = ValidationError::missing("gateway").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.is_validation());

        let err: DomainError = ValidationError::DonorNotFound { donor_id: 7 }.into();
        assert_eq!(err.code, ErrorCode::DonorNotFound);
        assert!(err.is_validation());
    }
}
