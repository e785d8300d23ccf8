use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::engine::{Constraint, Registries, Scheduler};
use crate::limits::*;
use crate::model::{Event, Resource};
use crate::notify::NotifyHub;

/// Everything needed to rebuild a scheduler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub resources: Vec<Resource>,
    pub events: Vec<Event>,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug)]
pub enum SnapshotError {
    NotFound,
    Corrupt(String),
    Io(io::Error),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::NotFound => write!(f, "no snapshot found"),
            SnapshotError::Corrupt(msg) => write!(f, "corrupt snapshot: {msg}"),
            SnapshotError::Io(e) => write!(f, "snapshot I/O error: {e}"),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for SnapshotError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::NotFound {
            SnapshotError::NotFound
        } else {
            SnapshotError::Io(e)
        }
    }
}

/// Where snapshots live. Saves must be atomic: a reader sees the old or the
/// new snapshot, never a mix.
pub trait SnapshotStore: Send + Sync {
    fn load(&self) -> Result<Snapshot, SnapshotError>;
    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError>;
}

impl Snapshot {
    /// Rebuild registries, checking every entity and every event's allocation
    /// against the loaded resources. An empty constraint set falls back to
    /// `default_constraints`.
    pub fn into_registries(
        self,
        default_constraints: Vec<Constraint>,
    ) -> Result<Registries, SnapshotError> {
        let mut reg = Registries::default();

        for resource in self.resources {
            resource.check().map_err(SnapshotError::Corrupt)?;
            let id = resource.id.clone();
            if !reg.resources.add(resource) {
                return Err(SnapshotError::Corrupt(format!("duplicate resource {id}")));
            }
        }

        for event in self.events {
            event.check_window().map_err(SnapshotError::Corrupt)?;
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&event.priority) {
                return Err(SnapshotError::Corrupt(format!(
                    "event {} has priority {} outside {MIN_PRIORITY}..={MAX_PRIORITY}",
                    event.id, event.priority
                )));
            }
            if let Some(missing) = event
                .allocation
                .iter()
                .find(|id| !reg.resources.contains(id))
            {
                return Err(SnapshotError::Corrupt(format!(
                    "event {} refers to unknown resource {missing}",
                    event.id
                )));
            }
            let id = event.id.clone();
            if !reg.events.add(event) {
                return Err(SnapshotError::Corrupt(format!("duplicate event {id}")));
            }
        }

        for constraint in &self.constraints {
            constraint
                .check()
                .map_err(|e| SnapshotError::Corrupt(e.to_string()))?;
        }
        reg.constraints = if self.constraints.is_empty() {
            default_constraints
        } else {
            self.constraints
        };

        Ok(reg)
    }
}

impl Scheduler {
    /// Copy of the current state, taken under the read lock.
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.read().await;
        Snapshot {
            resources: state.resources.iter().cloned().collect(),
            events: state.events.iter().cloned().collect(),
            constraints: state.constraints.clone(),
        }
    }

    pub fn from_snapshot(
        snapshot: Snapshot,
        default_constraints: Vec<Constraint>,
    ) -> Result<Self, SnapshotError> {
        let registries = snapshot.into_registries(default_constraints)?;
        Ok(Scheduler::new(registries, Arc::new(NotifyHub::new())))
    }
}

// ── Binary snapshot file ────────────────────────────────────────

/// Single-file store.
///
/// Format: `[u32: len][bincode: Snapshot][u32: crc32]`, little-endian.
/// Written to a temp file, fsynced, then renamed over the target.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        self.path.with_extension("snap.tmp")
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Snapshot, SnapshotError> {
        let file = File::open(&self.path)?;
        let mut reader = BufReader::new(file);

        let mut len_buf = [0u8; 4];
        read_frame_part(&mut reader, &mut len_buf, "length prefix")?;
        let len = u32::from_le_bytes(len_buf) as usize;

        let mut payload = vec![0u8; len];
        read_frame_part(&mut reader, &mut payload, "payload")?;

        let mut crc_buf = [0u8; 4];
        read_frame_part(&mut reader, &mut crc_buf, "checksum")?;
        let stored_crc = u32::from_le_bytes(crc_buf);
        if stored_crc != crc32fast::hash(&payload) {
            return Err(SnapshotError::Corrupt("checksum mismatch".into()));
        }

        let mut rest = Vec::new();
        reader.read_to_end(&mut rest)?;
        if !rest.is_empty() {
            return Err(SnapshotError::Corrupt(format!(
                "{} trailing bytes after frame",
                rest.len()
            )));
        }

        bincode::deserialize(&payload).map_err(|e| SnapshotError::Corrupt(e.to_string()))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let payload = bincode::serialize(snapshot)
            .map_err(|e| SnapshotError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            SnapshotError::Io(io::Error::new(
                io::ErrorKind::InvalidData,
                "snapshot larger than 4 GiB",
            ))
        })?;
        let crc = crc32fast::hash(&payload);

        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.tmp_path();
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            writer.write_all(&len.to_le_bytes())?;
            writer.write_all(&payload)?;
            writer.write_all(&crc.to_le_bytes())?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&tmp, &self.path).map_err(SnapshotError::Io)
    }
}

fn read_frame_part(
    reader: &mut impl Read,
    buf: &mut [u8],
    part: &str,
) -> Result<(), SnapshotError> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(SnapshotError::Corrupt(format!("truncated {part}")))
        }
        Err(e) => Err(SnapshotError::Io(e)),
    }
}

// ── JSON backups ────────────────────────────────────────────────

const BACKUP_PREFIX: &str = "backup_";
const BACKUP_SUFFIX: &str = ".json";

/// Write a human-readable copy as `backup_YYYYMMDD_HHMMSS.json` in `dir`.
pub fn write_backup(dir: &Path, snapshot: &Snapshot) -> Result<PathBuf, SnapshotError> {
    fs::create_dir_all(dir).map_err(SnapshotError::Io)?;
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("{BACKUP_PREFIX}{stamp}{BACKUP_SUFFIX}"));
    let mut writer = BufWriter::new(File::create(&path).map_err(SnapshotError::Io)?);
    serde_json::to_writer_pretty(&mut writer, snapshot)
        .map_err(|e| SnapshotError::Io(io::Error::other(e)))?;
    writer.flush().map_err(SnapshotError::Io)?;
    Ok(path)
}

/// Backups in `dir`, newest first. A missing directory has no backups.
pub fn list_backups(dir: &Path) -> Result<Vec<PathBuf>, SnapshotError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(SnapshotError::Io(e)),
    };
    let mut backups = Vec::new();
    for entry in entries {
        let path = entry.map_err(SnapshotError::Io)?.path();
        let is_backup = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(BACKUP_SUFFIX));
        if is_backup {
            backups.push(path);
        }
    }
    // The timestamp format sorts lexicographically.
    backups.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    Ok(backups)
}

pub fn load_backup(path: &Path) -> Result<Snapshot, SnapshotError> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|e| SnapshotError::Corrupt(e.to_string()))
}
