//! Periodic job scheduler.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::{Job, TaskQueue};

/// Jobs enqueued on every tick.
pub const PERIODIC_JOBS: [Job; 2] = [Job::AccrueInterest, Job::PurgeExpiredSessions];

/// Spawn a task that enqueues [`PERIODIC_JOBS`] every `period`.
///
/// The first tick fires immediately, so a restarted process catches up on
/// accruals that came due while it was down.
pub fn spawn(queue: TaskQueue, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            for job in PERIODIC_JOBS {
                let name = job.name();
                if let Err(e) = queue.enqueue(job).await {
                    tracing::error!(job = name, error = %e, "scheduled job failed");
                }
            }
        }
    })
}
