//! Single-file JSON store.

use crate::{PersistError, SnapshotStore};
use sim_core::Snapshot;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores the snapshot as pretty JSON in one file.
///
/// Saves go through a sibling temp file and a rename, so a crash mid-write
/// leaves the previous save intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for JsonFileStore {
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.temp_path();
        fs::write(&tmp, snapshot.to_json()?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), tick = snapshot.tick, "snapshot written");
        Ok(())
    }

    fn load(&mut self) -> Result<Option<Snapshot>, PersistError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(Some(Snapshot::from_json(&text)?))
    }

    fn reset(&mut self) -> Result<(), PersistError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
