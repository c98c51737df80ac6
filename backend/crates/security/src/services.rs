//! Component bundle
//!
//! Builds every security component from one [`SecurityConfig`] and one clock.
//! The components stay independent; this type only owns them.

use kernel::clock::SharedClock;
use platform::password::PasswordManager;
use serde::Serialize;

use crate::config::SecurityConfig;
use crate::error::ConfigError;
use crate::logger::SecurityLogger;
use crate::rate_limit::RateLimiter;
use crate::session::SessionManager;
use crate::token::TokenManager;
use crate::validator::InputValidator;

#[derive(Debug)]
pub struct SecurityServices {
    pub passwords: PasswordManager,
    pub validator: InputValidator,
    pub logger: SecurityLogger,
    pub rate_limiter: RateLimiter,
    pub sessions: SessionManager,
    pub tokens: TokenManager,
}

/// Entries reclaimed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub sessions: usize,
    pub rate_limits: usize,
}

impl SecurityServices {
    pub fn from_config(config: &SecurityConfig, clock: SharedClock) -> Result<Self, ConfigError> {
        let mut passwords = PasswordManager::new();
        if let Some(pepper) = &config.password_pepper {
            passwords = passwords.with_pepper(pepper.to_vec());
        }

        Ok(Self {
            passwords,
            validator: InputValidator::new(
                config.password_policy.clone(),
                config.upload_policy.clone(),
            ),
            logger: SecurityLogger::with_capacity(config.log_capacity, clock.clone()),
            rate_limiter: RateLimiter::new(
                config.rate_limit.clone(),
                config.login_attempts.clone(),
                clock.clone(),
            ),
            sessions: SessionManager::new(config.session_ttl, clock.clone()),
            tokens: TokenManager::from_config(config, clock)?,
        })
    }

    /// Swap the password hasher (e.g. cheaper Argon2 costs in tests)
    pub fn with_password_manager(mut self, passwords: PasswordManager) -> Self {
        self.passwords = passwords;
        self
    }

    /// Reclaim expired sessions, rate windows and idle login records
    pub fn sweep_expired(&self) -> SweepReport {
        let report = SweepReport {
            sessions: self.sessions.sweep_expired(),
            rate_limits: self.rate_limiter.sweep_expired(),
        };
        if report != SweepReport::default() {
            tracing::debug!(
                sessions = report.sessions,
                rate_limits = report.rate_limits,
                "Swept expired security state"
            );
        }
        report
    }
}
