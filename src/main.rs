use std::sync::Arc;

use tracing::{error, info, warn};

use allot::config::Config;
use allot::defaults;
use allot::engine::{Registries, Scheduler};
use allot::notify::NotifyHub;
use allot::snapshot::{self, FileSnapshotStore, SnapshotError, SnapshotStore};
use allot::{reaper, snapshotter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    allot::observability::init(config.metrics_port)?;

    std::fs::create_dir_all(&config.data_dir)?;
    let store: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(&config.snapshot_file));

    let scheduler = match store.load() {
        Ok(snap) => Scheduler::from_snapshot(snap, defaults::default_constraints())?,
        Err(SnapshotError::NotFound) => {
            let registries = if config.seed_defaults {
                info!("no snapshot found, seeding the default catalog");
                defaults::default_registries()
            } else {
                info!("no snapshot found, starting empty");
                Registries::default()
            };
            Scheduler::new(registries, Arc::new(NotifyHub::new()))
        }
        Err(e) => {
            // Never overwrite a snapshot we could not read.
            error!("cannot load {}: {e}", config.snapshot_file.display());
            return Err(e.into());
        }
    };
    let scheduler = Arc::new(scheduler);

    {
        let state = scheduler.read().await;
        info!("allot started");
        info!("  snapshot: {}", config.snapshot_file.display());
        info!("  backups: {}", config.backup_dir.display());
        info!("  resources: {}", state.resources.len());
        info!("  events: {}", state.events.len());
        info!("  constraints: {}", state.constraints.len());
        info!("  snapshot interval: {}s", config.snapshot_interval.as_secs());
        info!("  retention: {} day(s)", config.retention_days);
        let metrics = config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"));
        info!("  metrics: {metrics}");
    }

    let snapshot_task = tokio::spawn(snapshotter::run_snapshotter(
        scheduler.clone(),
        store.clone(),
        config.snapshot_interval,
    ));
    let reaper_task = (config.retention_days > 0).then(|| {
        tokio::spawn(reaper::run_reaper(
            scheduler.clone(),
            config.retention_days,
            config.purge_interval,
        ))
    });

    // Graceful shutdown on SIGTERM/ctrl-c
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received");
    snapshot_task.abort();
    if let Some(task) = reaper_task {
        task.abort();
    }

    snapshotter::save_now(&scheduler, &store).await?;
    let snap = scheduler.snapshot().await;
    match snapshot::write_backup(&config.backup_dir, &snap) {
        Ok(path) => info!("backup written to {}", path.display()),
        Err(e) => warn!("backup failed: {e}"),
    }

    info!("allot stopped");
    Ok(())
}
