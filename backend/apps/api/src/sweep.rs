//! Periodic sweep of expired sessions and rate-limit state

use std::sync::Arc;
use std::time::Duration;

use security::SecurityServices;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub fn spawn_sweeper(services: Arc<SecurityServices>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let report = services.sweep_expired();
            if report.sessions + report.rate_limits > 0 {
                tracing::info!(
                    sessions_deleted = report.sessions,
                    rate_limits_deleted = report.rate_limits,
                    "Expired security state swept"
                );
            }
        }
    })
}
