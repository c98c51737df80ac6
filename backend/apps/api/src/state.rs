//! Shared handler state

use std::sync::Arc;

use kernel::clock::SharedClock;
use platform::cookie::CookieConfig;
use security::SecurityServices;

use crate::accounts::{AccountDirectory, Role};
use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub services: Arc<SecurityServices>,
    pub accounts: Arc<AccountDirectory>,
    pub clock: SharedClock,
    pub secure_cookies: bool,
}

impl AppState {
    pub fn new(services: SecurityServices, clock: SharedClock, secure_cookies: bool) -> Self {
        Self {
            services: Arc::new(services),
            accounts: Arc::new(AccountDirectory::new()),
            clock,
            secure_cookies,
        }
    }

    pub fn session_cookie(&self) -> CookieConfig {
        let config = CookieConfig::session(self.services.sessions.ttl().as_secs() as i64);
        if self.secure_cookies {
            config
        } else {
            config.insecure()
        }
    }

    pub fn bearer_cookie(&self) -> CookieConfig {
        let config = CookieConfig::bearer(self.services.tokens.jwt_ttl().as_secs() as i64);
        if self.secure_cookies {
            config
        } else {
            config.insecure()
        }
    }

    /// Register an admin account at startup, applying the password policy
    pub fn seed_admin(&self, email: &str, password: &str) -> ApiResult<()> {
        let services = &self.services;
        if !services.validator.validate_email(email) {
            return Err(ApiError::Validation(vec!["Invalid admin email".to_string()]));
        }
        let report = services.validator.validate_password(password);
        if !report.valid {
            return Err(ApiError::Validation(report.errors));
        }

        let record = services.passwords.hash_password(password)?;
        let account = self
            .accounts
            .register(email, "Administrator", Role::Admin, record.to_string())?;

        tracing::info!(user_id = %account.id, "Admin account seeded");
        Ok(())
    }
}
