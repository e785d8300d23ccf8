use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::Scheduler;
use crate::observability;
use crate::snapshot::{SnapshotError, SnapshotStore};

/// Background task that periodically persists the scheduler's state.
/// Ticks where nothing was committed since the last save are skipped.
pub async fn run_snapshotter(
    scheduler: Arc<Scheduler>,
    store: Arc<dyn SnapshotStore>,
    every: Duration,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut saved = Some(scheduler.generation());
    loop {
        interval.tick().await;
        match save_if_changed(&scheduler, &store, &mut saved).await {
            Ok(true) => debug!("snapshot saved at generation {:?}", saved),
            Ok(false) => {}
            Err(e) => {
                metrics::counter!(observability::SNAPSHOT_FAILURES_TOTAL).increment(1);
                warn!("snapshot failed: {e}");
            }
        }
    }
}

/// Save when the generation moved past `saved` (or nothing was saved yet).
/// Returns whether a save happened.
pub async fn save_if_changed(
    scheduler: &Arc<Scheduler>,
    store: &Arc<dyn SnapshotStore>,
    saved: &mut Option<u64>,
) -> Result<bool, SnapshotError> {
    let generation = scheduler.generation();
    if *saved == Some(generation) {
        return Ok(false);
    }
    save_now(scheduler, store).await?;
    *saved = Some(generation);
    Ok(true)
}

/// Take a snapshot and write it off the async runtime.
pub async fn save_now(
    scheduler: &Arc<Scheduler>,
    store: &Arc<dyn SnapshotStore>,
) -> Result<(), SnapshotError> {
    let snapshot = scheduler.snapshot().await;
    let events = snapshot.events.len();
    let store = store.clone();
    let started = Instant::now();
    tokio::task::spawn_blocking(move || store.save(&snapshot))
        .await
        .map_err(|e| SnapshotError::Io(std::io::Error::other(e)))??;
    metrics::histogram!(observability::SNAPSHOT_SAVE_DURATION_SECONDS)
        .record(started.elapsed().as_secs_f64());
    info!("snapshot written ({events} events)");
    Ok(())
}
