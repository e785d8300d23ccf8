use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings, read from `ALLOT_*` environment variables.
/// Unparseable values fall back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub data_dir: PathBuf,
    pub snapshot_file: PathBuf,
    pub backup_dir: PathBuf,
    pub snapshot_interval: Duration,
    pub metrics_port: Option<u16>,
    pub seed_defaults: bool,
    /// Events that ended more than this many days ago are purged. 0 disables.
    pub retention_days: u32,
    pub purge_interval: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = PathBuf::from(lookup("ALLOT_DATA_DIR").unwrap_or_else(|| "./data".into()));
        let snapshot_name = lookup("ALLOT_SNAPSHOT_FILE").unwrap_or_else(|| "allot.snap".into());
        let backup_dir = lookup("ALLOT_BACKUP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("backups"));
        let interval_secs: u64 = lookup("ALLOT_SNAPSHOT_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|&s| s > 0)
            .unwrap_or(30);
        let metrics_port: Option<u16> = lookup("ALLOT_METRICS_PORT").and_then(|s| s.parse().ok());
        let seed_defaults = lookup("ALLOT_SEED_DEFAULTS")
            .and_then(|s| parse_flag(&s))
            .unwrap_or(true);
        let retention_days: u32 = lookup("ALLOT_RETENTION_DAYS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let purge_secs: u64 = lookup("ALLOT_PURGE_INTERVAL_SECS")
            .and_then(|s| s.parse().ok())
            .filter(|&s| s > 0)
            .unwrap_or(3600);

        Self {
            snapshot_file: data_dir.join(snapshot_name),
            data_dir,
            backup_dir,
            snapshot_interval: Duration::from_secs(interval_secs),
            metrics_port,
            seed_defaults,
            retention_days,
            purge_interval: Duration::from_secs(purge_secs),
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
