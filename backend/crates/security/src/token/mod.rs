//! Token Issuance and Verification
//!
//! Two HMAC-SHA256 signed formats sharing one server secret:
//! - Anti-forgery (CSRF) tokens bound to a user and session:
//!   `userId:sessionId:issuedAtMs:nonceHex:signatureHex`
//! - Compact bearer tokens in JWT form:
//!   `base64url(header).base64url(payload).base64url(signature)`
//!
//! ## Security Features
//! - Signatures are checked in constant time
//! - Public validators return `false` / `None` for every failure so callers
//!   cannot tell expired, tampered, and malformed tokens apart
//! - The typed reason is still available through `verify_*` for logging

mod csrf;
mod jwt;

use std::fmt;
use std::time::Duration;

use kernel::clock::SharedClock;
use platform::crypto::HmacKey;

use crate::config::SecurityConfig;
use crate::error::ConfigError;

pub use jwt::{Claims, JWT_HEADER};

/// Issues and validates CSRF and bearer tokens
#[derive(Clone)]
pub struct TokenManager {
    key: HmacKey,
    csrf_ttl: Duration,
    jwt_ttl: Duration,
    clock: SharedClock,
}

impl TokenManager {
    pub fn new(key: HmacKey, csrf_ttl: Duration, jwt_ttl: Duration, clock: SharedClock) -> Self {
        Self {
            key,
            csrf_ttl,
            jwt_ttl,
            clock,
        }
    }

    /// Build from configuration, keying HMAC with the configured secret
    pub fn from_config(config: &SecurityConfig, clock: SharedClock) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.signing_secret.signing_key()?,
            config.csrf_token_ttl,
            config.jwt_ttl,
            clock,
        ))
    }

    pub fn csrf_ttl(&self) -> Duration {
        self.csrf_ttl
    }

    pub fn jwt_ttl(&self) -> Duration {
        self.jwt_ttl
    }
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("key", &self.key)
            .field("csrf_ttl", &self.csrf_ttl)
            .field("jwt_ttl", &self.jwt_ttl)
            .finish()
    }
}
