//! Security Error Types
//!
//! Token validators never surface these to callers; the public API collapses
//! every [`TokenRejection`] into `false` / `None`. The reason is kept typed so
//! it can still be logged.

use platform::crypto::CryptoError;
use thiserror::Error;

/// Why a CSRF or bearer token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenRejection {
    /// Wrong shape, bad encoding, or undecodable payload
    #[error("token is malformed")]
    Malformed,

    /// Lifetime exceeded
    #[error("token has expired")]
    Expired,

    /// Token was issued to a different user or session
    #[error("token identity does not match caller")]
    IdentityMismatch,

    /// Recomputed signature differs
    #[error("token signature mismatch")]
    SignatureMismatch,
}

impl TokenRejection {
    /// Stable label for structured logs
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenRejection::Malformed => "malformed",
            TokenRejection::Expired => "expired",
            TokenRejection::IdentityMismatch => "identity_mismatch",
            TokenRejection::SignatureMismatch => "signature_mismatch",
        }
    }
}

/// Configuration errors raised at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No signing secret configured; the process must not start
    #[error("{var} must be set")]
    MissingSecret { var: &'static str },

    #[error("Signing secret must be at least {min} bytes (got {actual})")]
    SecretTooShort { min: usize, actual: usize },

    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Invalid signing key: {0}")]
    SigningKey(#[from] CryptoError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_labels_are_distinct() {
        let labels = [
            TokenRejection::Malformed.as_str(),
            TokenRejection::Expired.as_str(),
            TokenRejection::IdentityMismatch.as_str(),
            TokenRejection::SignatureMismatch.as_str(),
        ];
        for (i, a) in labels.iter().enumerate() {
            for b in &labels[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::MissingSecret {
            var: "SECURITY_SIGNING_SECRET",
        };
        assert_eq!(err.to_string(), "SECURITY_SIGNING_SECRET must be set");

        let err = ConfigError::SecretTooShort { min: 32, actual: 4 };
        assert!(err.to_string().contains("32"));
    }
}
