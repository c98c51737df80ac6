//! Security Event Log
//!
//! Bounded in-memory record of security-relevant events. Each entry is also
//! emitted through `tracing` so it reaches the process log.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use kernel::clock::SharedClock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DEFAULT_LOG_CAPACITY;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Entries returned in [`SecurityStats::recent_events`]
pub const RECENT_EVENTS: usize = 10;

/// Event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityLogEntry {
    pub timestamp_ms: i64,
    pub event: String,
    pub details: Value,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BySeverity {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Aggregates over the current buffer contents
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityStats {
    pub total_events: usize,
    pub events_24h: usize,
    pub by_severity: BySeverity,
    /// Newest entries, oldest first
    pub recent_events: Vec<SecurityLogEntry>,
}

/// Ring buffer of security events
pub struct SecurityLogger {
    entries: Mutex<VecDeque<SecurityLogEntry>>,
    capacity: usize,
    clock: SharedClock,
}

impl SecurityLogger {
    pub fn new(clock: SharedClock) -> Self {
        Self::with_capacity(DEFAULT_LOG_CAPACITY, clock)
    }

    /// Capacity is clamped to at least one entry
    pub fn with_capacity(capacity: usize, clock: SharedClock) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            clock,
        }
    }

    /// Append an event, evicting the oldest once full
    pub fn log_security_event(&self, event: &str, details: Value, severity: Severity) {
        let timestamp_ms = self.clock.now_ms();

        match severity {
            Severity::Low => tracing::info!(
                event = %event, severity = %severity, details = %details, "Security event"
            ),
            Severity::Medium => tracing::warn!(
                event = %event, severity = %severity, details = %details, "Security event"
            ),
            Severity::High => tracing::error!(
                event = %event, severity = %severity, details = %details, "Security event"
            ),
        }

        let mut entries = self.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(SecurityLogEntry {
            timestamp_ms,
            event: event.to_string(),
            details,
            severity,
        });
    }

    pub fn get_security_stats(&self) -> SecurityStats {
        let cutoff = self.clock.now_ms() - DAY_MS;
        let entries = self.lock();

        let mut by_severity = BySeverity::default();
        let mut events_24h = 0;
        for entry in entries.iter() {
            match entry.severity {
                Severity::Low => by_severity.low += 1,
                Severity::Medium => by_severity.medium += 1,
                Severity::High => by_severity.high += 1,
            }
            if entry.timestamp_ms > cutoff {
                events_24h += 1;
            }
        }

        let skip = entries.len().saturating_sub(RECENT_EVENTS);
        SecurityStats {
            total_events: entries.len(),
            events_24h,
            by_severity,
            recent_events: entries.iter().skip(skip).cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<SecurityLogEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SecurityLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityLogger")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
