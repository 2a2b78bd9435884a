//! JSON state file adapter.
//!
//! Persists the goal and both relay states in one small document:
//!
//! ```json
//! { "goal": { "target_c": 18.0, "drift_c": 0.5 },
//!   "relays": { "heating": false, "cooling": true } }
//! ```
//!
//! Writes go to a temp file in the same directory which is then renamed
//! over the target, so a crash mid-write never leaves a truncated file.
//! The goal is reloaded from disk on every read so an external writer can
//! retarget a running regulator.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::app::ports::{ConfigError, GoalSource, StorageError};
use crate::control::{Goal, Purpose};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStates {
    pub heating: bool,
    pub cooling: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    goal: Option<Goal>,
    #[serde(default)]
    relays: RelayStates,
}

/// File-backed (or in-memory) store shared by the relays and the goal source.
pub struct JsonStore {
    path: Option<PathBuf>,
    doc: Mutex<StateDocument>,
}

impl JsonStore {
    /// Open `path`. A missing file starts from an empty document; it is
    /// created on the first write.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let doc = match read_document(&path) {
            Ok(doc) => {
                info!("Loaded state from {}", path.display());
                doc
            }
            Err(StorageError::NotFound) => {
                info!("No state file at {}, starting fresh", path.display());
                StateDocument::default()
            }
            Err(e) => return Err(e),
        };
        Ok(Self {
            path: Some(path),
            doc: Mutex::new(doc),
        })
    }

    /// Volatile store for tests and dry runs.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            doc: Mutex::new(StateDocument::default()),
        }
    }

    pub fn relay_state(&self, purpose: Purpose) -> Result<bool, StorageError> {
        let doc = self.lock()?;
        Ok(match purpose {
            Purpose::Heating => doc.relays.heating,
            Purpose::Cooling => doc.relays.cooling,
        })
    }

    pub fn relay_states(&self) -> Result<RelayStates, StorageError> {
        Ok(self.lock()?.relays)
    }

    /// Record a relay state. The goal currently on disk is carried over,
    /// so an external goal edit is never reverted by a relay write.
    pub fn set_relay_state(&self, purpose: Purpose, on: bool) -> Result<(), StorageError> {
        let mut doc = self.lock()?;
        let mut next = doc.clone();
        if let Some(fresh) = self.on_disk() {
            next.goal = fresh.goal;
        }
        match purpose {
            Purpose::Heating => next.relays.heating = on,
            Purpose::Cooling => next.relays.cooling = on,
        }
        self.persist(&next)?;
        *doc = next;
        Ok(())
    }

    /// The stored goal, reloaded from disk when file-backed.
    pub fn stored_goal(&self) -> Result<Option<Goal>, StorageError> {
        let mut doc = self.lock()?;
        if let Some(fresh) = self.on_disk() {
            doc.goal = fresh.goal;
        }
        Ok(doc.goal)
    }

    /// Validate and persist a new goal. Relay states on disk are kept.
    pub fn set_goal(&self, goal: Goal) -> Result<(), ConfigError> {
        goal.validate()?;
        let mut doc = self.lock()?;
        let mut next = doc.clone();
        if let Some(fresh) = self.on_disk() {
            next.relays = fresh.relays;
        }
        next.goal = Some(goal);
        self.persist(&next)?;
        *doc = next;
        info!("Goal set to {:.2}\u{00b0}C \u{00b1}{:.2}", goal.target_c, goal.drift_c);
        Ok(())
    }

    // ── Internal ──────────────────────────────────────────────────

    fn lock(&self) -> Result<MutexGuard<'_, StateDocument>, StorageError> {
        self.doc.lock().map_err(|_| StorageError::IoError)
    }

    /// Current file contents, or `None` for an in-memory store, a file not
    /// written yet, or an unreadable file (logged).
    fn on_disk(&self) -> Option<StateDocument> {
        let path = self.path.as_ref()?;
        match read_document(path) {
            Ok(fresh) => Some(fresh),
            Err(StorageError::NotFound) => None,
            Err(e) => {
                warn!("Reload of {} failed ({}), using cached", path.display(), e);
                None
            }
        }
    }

    fn persist(&self, doc: &StateDocument) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_atomic(path, doc).map_err(|e| {
            warn!("Failed to write {}: {}", path.display(), e);
            StorageError::IoError
        })
    }
}

impl GoalSource for JsonStore {
    fn goal(&self) -> Result<Goal, ConfigError> {
        let goal = self.stored_goal()?.ok_or(ConfigError::NotFound)?;
        goal.validate()?;
        Ok(goal)
    }
}

fn read_document(path: &Path) -> Result<StateDocument, StorageError> {
    let bytes = fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        _ => StorageError::IoError,
    })?;
    serde_json::from_slice(&bytes).map_err(|_| StorageError::Corrupted)
}

fn write_atomic(path: &Path, doc: &StateDocument) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, doc)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
