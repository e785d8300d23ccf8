use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::engine::Scheduler;
use crate::model::{DAY_MS, Ms};

/// Background task that periodically purges events which ended more than
/// `retention_days` ago.
pub async fn run_reaper(scheduler: Arc<Scheduler>, retention_days: u32, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let purged = reap_once(&scheduler, retention_days).await;
        if purged == 0 {
            debug!("reaper: nothing older than {retention_days} day(s)");
        }
    }
}

/// One purge pass. Returns how many events were removed.
pub async fn reap_once(scheduler: &Scheduler, retention_days: u32) -> usize {
    scheduler
        .purge_completed(retention_days as Ms * DAY_MS)
        .await
        .len()
}
