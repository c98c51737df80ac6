//! Server configuration

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

const DEFAULT_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";

/// HTTP-layer settings; security settings live in `security::SecurityConfig`
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub addr: SocketAddr,
    pub frontend_origins: Vec<String>,
    /// Mark cookies `Secure` (disable only for plain-HTTP development)
    pub secure_cookies: bool,
    /// Period of the expired-state sweep
    pub sweep_interval: Duration,
    /// Optional admin account seeded at startup
    pub admin: Option<AdminSeed>,
}

#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let addr = env::var("API_ADDR")
            .unwrap_or_else(|_| DEFAULT_ADDR.to_string())
            .parse()
            .context("API_ADDR must be a socket address")?;

        let frontend_origins = env::var("FRONTEND_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let secure_cookies = match env::var("COOKIE_SECURE") {
            Ok(value) => value
                .parse()
                .context("COOKIE_SECURE must be true or false")?,
            Err(_) => !cfg!(debug_assertions),
        };

        let sweep_interval = match env::var("SECURITY_SWEEP_INTERVAL_SECS") {
            Ok(value) => {
                let secs: u64 = value
                    .parse()
                    .context("SECURITY_SWEEP_INTERVAL_SECS must be an integer")?;
                anyhow::ensure!(secs > 0, "SECURITY_SWEEP_INTERVAL_SECS must be positive");
                Duration::from_secs(secs)
            }
            Err(_) => Duration::from_secs(60),
        };

        let admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(AdminSeed { email, password }),
            _ => None,
        };

        Ok(Self {
            addr,
            frontend_origins,
            secure_cookies,
            sweep_interval,
            admin,
        })
    }
}
