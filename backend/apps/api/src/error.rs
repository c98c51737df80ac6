//! API Error Types
//!
//! Route-level failures. Every variant renders through
//! `kernel::error::AppError` so clients always get RFC 7807 bodies.

use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use security::PasswordHashError;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    /// One message per violated input rule
    #[error("{}", .0.join("; "))]
    Validation(Vec<String>),

    /// Unknown account or wrong password (indistinguishable on purpose)
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account temporarily locked")]
    AccountLocked { retry_after_secs: u64 },

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    /// Missing, expired, or unknown session / bearer token
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    Forbidden,

    #[error("Invalid or missing CSRF token")]
    CsrfRejected,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Rate limit store unavailable")]
    RateLimitStore(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] PasswordHashError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Validation(_) => ErrorKind::BadRequest,
            ApiError::InvalidCredentials | ApiError::Unauthenticated => ErrorKind::Unauthorized,
            ApiError::Forbidden | ApiError::CsrfRejected => ErrorKind::Forbidden,
            ApiError::AccountLocked { .. } => ErrorKind::Locked,
            ApiError::RateLimited { .. } => ErrorKind::TooManyRequests,
            ApiError::EmailTaken => ErrorKind::Conflict,
            ApiError::RateLimitStore(_) => ErrorKind::ServiceUnavailable,
            ApiError::PasswordHash(_) | ApiError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    fn log(&self) {
        match self {
            ApiError::PasswordHash(e) => {
                tracing::error!(error = %e, "Password hashing error");
            }
            ApiError::Internal(msg) => {
                tracing::error!(message = %msg, "API internal error");
            }
            ApiError::RateLimitStore(msg) => {
                tracing::error!(message = %msg, "Rate limit store error");
            }
            ApiError::AccountLocked { .. } | ApiError::RateLimited { .. } => {
                tracing::warn!(error = %self, "Request rejected by policy");
            }
            _ => {
                tracing::debug!(error = %self, "API error");
            }
        }
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        let kind = err.kind();
        match err {
            // Hide internals from clients
            ApiError::PasswordHash(_) | ApiError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            ApiError::AccountLocked { retry_after_secs } => AppError::new(kind, err.to_string())
                .with_retry_after_secs(retry_after_secs)
                .with_action("Wait for the lockout to expire or reset your password"),
            ApiError::RateLimited { retry_after_secs } => AppError::new(kind, err.to_string())
                .with_retry_after_secs(retry_after_secs)
                .with_action("Wait before retrying"),
            ApiError::CsrfRejected => AppError::new(kind, err.to_string())
                .with_action("Fetch a fresh token from /api/auth/csrf"),
            _ => AppError::new(kind, err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.log();
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{StatusCode, header};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Validation(vec!["x".into()]), StatusCode::BAD_REQUEST),
            (ApiError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (ApiError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (ApiError::Forbidden, StatusCode::FORBIDDEN),
            (ApiError::CsrfRejected, StatusCode::FORBIDDEN),
            (ApiError::EmailTaken, StatusCode::CONFLICT),
            (
                ApiError::AccountLocked {
                    retry_after_secs: 5,
                },
                StatusCode::LOCKED,
            ),
            (
                ApiError::RateLimited {
                    retry_after_secs: 5,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                ApiError::RateLimitStore("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::Internal("boom".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_validation_message_joins_errors() {
        let err = ApiError::Validation(vec!["first".into(), "second".into()]);
        assert_eq!(err.to_string(), "first; second");
    }

    #[test]
    fn test_policy_errors_carry_retry_after() {
        let response = ApiError::RateLimited {
            retry_after_secs: 42,
        }
        .into_response();
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }

    #[test]
    fn test_internal_details_hidden() {
        let app: AppError = ApiError::Internal("db password is hunter2".into()).into();
        assert!(!app.message().contains("hunter2"));
    }
}
