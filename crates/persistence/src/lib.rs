#![deny(warnings)]

//! Persistence layer: snapshot stores for Brick Tycoon sessions.
//!
//! A store accepts and returns [`Snapshot`]s. Three backends are provided:
//! an in-memory slot, a single JSON file and a SQLite database (sqlx).

mod file;
pub mod sqlite;

use sim_core::Snapshot;
use thiserror::Error;
use tracing::debug;

pub use file::JsonFileStore;
pub use sqlite::{create_save, init_db, SqliteStore};

/// Errors raised by snapshot stores.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Somewhere a session snapshot can be saved to and loaded from.
pub trait SnapshotStore {
    /// Replace the stored snapshot.
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistError>;

    /// The stored snapshot, or `None` when nothing was saved yet.
    fn load(&mut self) -> Result<Option<Snapshot>, PersistError>;

    /// Forget the stored snapshot.
    fn reset(&mut self) -> Result<(), PersistError>;
}

/// Load the stored snapshot, falling back to the starting state.
pub fn load_or_default<S: SnapshotStore + ?Sized>(store: &mut S) -> Result<Snapshot, PersistError> {
    match store.load()? {
        Some(snap) => Ok(snap),
        None => {
            debug!("no saved snapshot, starting fresh");
            Ok(Snapshot::default())
        }
    }
}

/// Returns the default SQLite URL used for local saves.
pub fn default_sqlite_url() -> &'static str {
    "sqlite://./saves/main.db"
}

/// Keeps the last snapshot in memory, encoded as JSON like the other stores.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Option<String>,
    saves: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> u64 {
        self.saves
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistError> {
        self.slot = Some(snapshot.to_json()?);
        self.saves += 1;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<Snapshot>, PersistError> {
        match &self.slot {
            Some(text) => Ok(Some(Snapshot::from_json(text)?)),
            None => Ok(None),
        }
    }

    fn reset(&mut self) -> Result<(), PersistError> {
        self.slot = None;
        Ok(())
    }
}
