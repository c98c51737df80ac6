//! Security Configuration
//!
//! Lifetimes, limits, and the signing secret shared by every component.
//!
//! ## Security Requirements
//! - The signing secret is mandatory; [`SecurityConfig::from_env`] fails when
//!   it is missing or shorter than [`MIN_SECRET_LEN`] bytes
//! - Secrets are zeroized on drop and never printed by `Debug`

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use kernel::clock::duration_ms;
use platform::crypto::{HmacKey, random_bytes};
use platform::rate_limit::RateLimitConfig;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::ConfigError;
use crate::validator::{PasswordPolicy, UploadPolicy};

// ============================================================================
// Environment Variables
// ============================================================================

pub const SIGNING_SECRET_ENV: &str = "SECURITY_SIGNING_SECRET";
pub const CSRF_TTL_ENV: &str = "SECURITY_CSRF_TTL_SECS";
pub const JWT_TTL_ENV: &str = "SECURITY_JWT_TTL_SECS";
pub const SESSION_TTL_ENV: &str = "SECURITY_SESSION_TTL_SECS";
pub const RATE_LIMIT_WINDOW_ENV: &str = "SECURITY_RATE_LIMIT_WINDOW_SECS";
pub const RATE_LIMIT_MAX_ENV: &str = "SECURITY_RATE_LIMIT_MAX_REQUESTS";
pub const LOGIN_MAX_ATTEMPTS_ENV: &str = "SECURITY_LOGIN_MAX_ATTEMPTS";
pub const LOGIN_LOCKOUT_ENV: &str = "SECURITY_LOGIN_LOCKOUT_SECS";
pub const PASSWORD_MIN_LENGTH_ENV: &str = "SECURITY_PASSWORD_MIN_LENGTH";
pub const PASSWORD_REJECT_COMMON_ENV: &str = "SECURITY_PASSWORD_REJECT_COMMON";
pub const UPLOAD_MAX_BYTES_ENV: &str = "SECURITY_UPLOAD_MAX_BYTES";
pub const LOG_CAPACITY_ENV: &str = "SECURITY_LOG_CAPACITY";
pub const PASSWORD_PEPPER_ENV: &str = "SECURITY_PASSWORD_PEPPER";

/// Upper bound for any lifetime or window read from the environment (one year)
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Minimum signing secret length in bytes
pub const MIN_SECRET_LEN: usize = 32;

/// Default security log ring buffer capacity
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

// ============================================================================
// Signing Secret
// ============================================================================

/// Server-held HMAC secret
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap a secret, rejecting anything shorter than [`MIN_SECRET_LEN`]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ConfigError> {
        let bytes = bytes.into();
        if bytes.len() < MIN_SECRET_LEN {
            return Err(ConfigError::SecretTooShort {
                min: MIN_SECRET_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes))
    }

    /// Fresh random secret (tokens do not survive a restart)
    pub fn random() -> Self {
        Self(random_bytes(MIN_SECRET_LEN))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Build the HMAC key used by the token manager
    pub fn signing_key(&self) -> Result<HmacKey, ConfigError> {
        Ok(HmacKey::new(&self.0)?)
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSecret([REDACTED])")
    }
}

// ============================================================================
// Login Attempt Policy
// ============================================================================

/// Failed-login lockout policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginAttemptConfig {
    /// Failures allowed before the account locks
    pub max_attempts: u32,
    /// How long the account stays locked
    pub lockout_duration: Duration,
}

impl Default for LoginAttemptConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration: Duration::from_secs(15 * 60),
        }
    }
}

impl LoginAttemptConfig {
    pub fn lockout_ms(&self) -> i64 {
        duration_ms(self.lockout_duration)
    }
}

// ============================================================================
// Security Config
// ============================================================================

/// Configuration for every security component
#[derive(Clone)]
pub struct SecurityConfig {
    /// HMAC secret for CSRF and bearer tokens
    pub signing_secret: SigningSecret,
    /// Anti-forgery token lifetime
    pub csrf_token_ttl: Duration,
    /// Bearer token `exp - iat`
    pub jwt_ttl: Duration,
    /// Session lifetime, restarted by refresh
    pub session_ttl: Duration,
    pub rate_limit: RateLimitConfig,
    pub login_attempts: LoginAttemptConfig,
    pub password_policy: PasswordPolicy,
    pub upload_policy: UploadPolicy,
    /// Security log ring buffer size
    pub log_capacity: usize,
    /// Optional pepper appended to passwords before hashing
    pub password_pepper: Option<Zeroizing<Vec<u8>>>,
}

impl SecurityConfig {
    /// Default lifetimes and limits with the given secret
    pub fn new(signing_secret: SigningSecret) -> Self {
        Self {
            signing_secret,
            csrf_token_ttl: Duration::from_secs(5 * 60),
            jwt_ttl: Duration::from_secs(30 * 60),
            session_ttl: Duration::from_secs(30 * 60),
            rate_limit: RateLimitConfig::default(),
            login_attempts: LoginAttemptConfig::default(),
            password_policy: PasswordPolicy::default(),
            upload_policy: UploadPolicy::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            password_pepper: None,
        }
    }

    /// Default limits with a random secret (tests and local development)
    pub fn development() -> Self {
        Self::new(SigningSecret::random())
    }

    /// Load from process environment
    ///
    /// Fails closed when [`SIGNING_SECRET_ENV`] is unset or too short.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(SIGNING_SECRET_ENV)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret {
                var: SIGNING_SECRET_ENV,
            })?;
        let mut config = Self::new(SigningSecret::new(secret.into_bytes())?);

        if let Some(ttl) = parse_duration(&lookup, CSRF_TTL_ENV)? {
            config.csrf_token_ttl = ttl;
        }
        if let Some(ttl) = parse_duration(&lookup, JWT_TTL_ENV)? {
            config.jwt_ttl = ttl;
        }
        if let Some(ttl) = parse_duration(&lookup, SESSION_TTL_ENV)? {
            config.session_ttl = ttl;
        }
        if let Some(window) = parse_duration(&lookup, RATE_LIMIT_WINDOW_ENV)? {
            config.rate_limit.window = window;
        }
        if let Some(max) = parse_positive::<u32, _>(&lookup, RATE_LIMIT_MAX_ENV)? {
            config.rate_limit.max_requests = max;
        }
        if let Some(max) = parse_positive::<u32, _>(&lookup, LOGIN_MAX_ATTEMPTS_ENV)? {
            config.login_attempts.max_attempts = max;
        }
        if let Some(lockout) = parse_duration(&lookup, LOGIN_LOCKOUT_ENV)? {
            config.login_attempts.lockout_duration = lockout;
        }
        if let Some(min) = parse_var::<usize, _>(&lookup, PASSWORD_MIN_LENGTH_ENV)? {
            config.password_policy.min_length = min;
        }
        if let Some(reject) = parse_var::<bool, _>(&lookup, PASSWORD_REJECT_COMMON_ENV)? {
            config.password_policy.reject_common_patterns = reject;
        }
        if let Some(bytes) = parse_var::<u64, _>(&lookup, UPLOAD_MAX_BYTES_ENV)? {
            config.upload_policy.max_file_size = bytes;
        }
        if let Some(capacity) = parse_positive::<usize, _>(&lookup, LOG_CAPACITY_ENV)? {
            config.log_capacity = capacity;
        }
        if let Some(pepper) = lookup(PASSWORD_PEPPER_ENV).filter(|p| !p.is_empty()) {
            config.password_pepper = Some(Zeroizing::new(pepper.into_bytes()));
        }

        Ok(config)
    }

    pub fn csrf_token_ttl_ms(&self) -> i64 {
        duration_ms(self.csrf_token_ttl)
    }

    pub fn jwt_ttl_secs(&self) -> i64 {
        i64::try_from(self.jwt_ttl.as_secs()).unwrap_or(i64::MAX)
    }

    pub fn session_ttl_ms(&self) -> i64 {
        duration_ms(self.session_ttl)
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("signing_secret", &self.signing_secret)
            .field("csrf_token_ttl", &self.csrf_token_ttl)
            .field("jwt_ttl", &self.jwt_ttl)
            .field("session_ttl", &self.session_ttl)
            .field("rate_limit", &self.rate_limit)
            .field("login_attempts", &self.login_attempts)
            .field("password_policy", &self.password_policy)
            .field("upload_policy", &self.upload_policy)
            .field("log_capacity", &self.log_capacity)
            .field(
                "password_pepper",
                &self.password_pepper.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
    }
}

/// Whole seconds, at most [`MAX_DURATION_SECS`]
fn parse_duration<F>(lookup: &F, var: &'static str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<u64, F>(lookup, var)? {
        Some(secs) if secs > MAX_DURATION_SECS => Err(ConfigError::InvalidValue {
            var,
            value: secs.to_string(),
        }),
        other => Ok(other.map(Duration::from_secs)),
    }
}

fn parse_positive<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr + Default + PartialEq + ToString,
    F: Fn(&str) -> Option<String>,
{
    match parse_var::<T, F>(lookup, var)? {
        Some(value) if value == T::default() => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
        other => Ok(other),
    }
}
