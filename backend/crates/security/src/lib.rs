//! Security Primitives
//!
//! In-process building blocks for the agency's authentication flow:
//! - `validator` - Sanitization and field rules (email, password, uploads)
//! - `logger` - Bounded security event log with severity stats
//! - `rate_limit` - Fixed-window request limits and login lockout
//! - `session` - Ephemeral session store
//! - `token` - CSRF and HS256 bearer tokens
//!
//! Password hashing lives in `platform::password` and is re-exported here.
//!
//! ## Security Model
//! - Every store is process-local, mutex-guarded, and reads time from an
//!   injectable [`kernel::clock::Clock`]
//! - The signing secret is required at startup; there is no fallback
//! - Token validators never reveal why a token was refused

pub mod config;
pub mod error;
pub mod logger;
pub mod rate_limit;
pub mod services;
pub mod session;
pub mod token;
pub mod validator;

pub use config::{LoginAttemptConfig, SecurityConfig, SigningSecret};
pub use error::{ConfigError, TokenRejection};
pub use logger::{SecurityLogger, SecurityStats, Severity};
pub use platform::password::{PasswordHashError, PasswordManager, PasswordRecord};
pub use platform::rate_limit::{RateLimitConfig, RateLimitResult};
pub use rate_limit::{LoginAttemptStatus, RateLimiter};
pub use services::{SecurityServices, SweepReport};
pub use session::{SessionManager, SessionValidation};
pub use token::{Claims, TokenManager};
pub use validator::{InputValidator, PasswordPolicy, UploadPolicy, ValidationReport};
