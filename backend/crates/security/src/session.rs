//! Ephemeral Session Store
//!
//! Sessions live in process memory only and are keyed by a 256-bit random
//! identifier rendered as hex.
//!
//! ## Lifecycle
//! `active -> (expired-on-lookup | destroyed)`, `active -> active` on refresh.
//! An expired or destroyed session never comes back; the caller must create a
//! new one.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use kernel::clock::{SharedClock, duration_ms};
use platform::crypto::random_hex;
use serde::Serialize;

/// Session identifier entropy in bytes
pub const SESSION_ID_BYTES: usize = 32;

#[derive(Debug, Clone)]
struct SessionRecord {
    user_id: String,
    role: String,
    expires_at_ms: i64,
}

impl SessionRecord {
    fn is_expired(&self, now_ms: i64) -> bool {
        now_ms > self.expires_at_ms
    }
}

/// Result of a session lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionValidation {
    pub valid: bool,
    pub user_id: Option<String>,
    pub role: Option<String>,
}

impl SessionValidation {
    fn invalid() -> Self {
        Self {
            valid: false,
            user_id: None,
            role: None,
        }
    }
}

pub struct SessionManager {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    ttl: Duration,
    clock: SharedClock,
}

impl SessionManager {
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn ttl_ms(&self) -> i64 {
        duration_ms(self.ttl)
    }

    /// Start a session and return its identifier
    pub fn create_session(&self, user_id: &str, role: &str) -> String {
        let session_id = random_hex(SESSION_ID_BYTES);
        let expires_at_ms = self.clock.now_ms().saturating_add(self.ttl_ms());

        self.lock().insert(
            session_id.clone(),
            SessionRecord {
                user_id: user_id.to_string(),
                role: role.to_string(),
                expires_at_ms,
            },
        );

        tracing::debug!(user_id = %user_id, role = %role, expires_at_ms, "Session created");
        session_id
    }

    /// Look up a session, deleting it if it has expired
    pub fn validate_session(&self, session_id: &str) -> SessionValidation {
        let now = self.clock.now_ms();
        let mut sessions = self.lock();

        let Some(record) = sessions.get(session_id) else {
            return SessionValidation::invalid();
        };

        if record.is_expired(now) {
            sessions.remove(session_id);
            tracing::debug!("Expired session removed on lookup");
            return SessionValidation::invalid();
        }

        SessionValidation {
            valid: true,
            user_id: Some(record.user_id.clone()),
            role: Some(record.role.clone()),
        }
    }

    pub fn destroy_session(&self, session_id: &str) {
        self.lock().remove(session_id);
    }

    /// Push expiry to `now + ttl`; false if the session is gone or expired
    pub fn refresh_session(&self, session_id: &str) -> bool {
        let now = self.clock.now_ms();
        let expires_at_ms = now.saturating_add(self.ttl_ms());
        let mut sessions = self.lock();

        let Some(record) = sessions.get_mut(session_id) else {
            return false;
        };

        if record.is_expired(now) {
            sessions.remove(session_id);
            return false;
        }

        record.expires_at_ms = expires_at_ms;
        true
    }

    /// Destroy every session bound to `user_id`; returns how many were removed
    pub fn destroy_user_sessions(&self, user_id: &str) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, record| record.user_id != user_id);
        before - sessions.len()
    }

    /// Number of stored sessions, including expired ones not yet swept
    pub fn active_sessions(&self) -> usize {
        self.lock().len()
    }

    /// Remove every expired session; returns how many were removed
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, record| !record.is_expired(now));
        before - sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionRecord>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .field("sessions", &self.active_sessions())
            .finish()
    }
}
