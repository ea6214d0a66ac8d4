//! Background expiry of stale invitations.
//!
//! [`spawn_sweeper`] runs [`CapstoneService::sweep_expired_invitations`] on a
//! fixed interval until [`SweeperHandle::shutdown`] is called. A failed pass
//! is logged and the next tick tries again.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::service::CapstoneService;

pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl SweeperHandle {
    /// Stop after the pass in flight (if any) and return the total number
    /// of invitations expired.
    pub async fn shutdown(self) -> u64 {
        let _ = self.stop.send(true);
        match self.task.await {
            Ok(total) => total,
            Err(e) => {
                tracing::warn!(error = %e, "expiry sweeper task failed");
                0
            }
        }
    }
}

/// Start the sweeper on the current runtime.
#[must_use]
pub fn spawn_sweeper(service: CapstoneService, every: Duration) -> SweeperHandle {
    let (stop, mut stopped) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut total = 0u64;

        tracing::info!(interval_secs = every.as_secs(), "expiry sweeper started");
        loop {
            tokio::select! {
                _ = stopped.changed() => break,
                _ = ticker.tick() => {}
            }
            match service.sweep_expired_invitations(Utc::now()).await {
                Ok(expired) => total += expired.len() as u64,
                Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
            }
        }
        tracing::info!(total, "expiry sweeper stopped");
        total
    });
    SweeperHandle { stop, task }
}
