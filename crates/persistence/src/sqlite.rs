//! SQLite store: named saves, each keeping its latest snapshot.

use crate::{PersistError, SnapshotStore};
use chrono::Utc;
use sim_core::Snapshot;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::debug;

/// Open (creating if needed) the database at `url` and ensure the schema.
pub async fn init_db(url: &str) -> Result<SqlitePool, PersistError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);
    // One long-lived connection: in-memory databases live and die with it.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    sqlx::query(
        r"CREATE TABLE IF NOT EXISTS saves (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            created_at TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r"CREATE TABLE IF NOT EXISTS snapshots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            save_id INTEGER NOT NULL REFERENCES saves(id) ON DELETE CASCADE,
            tick INTEGER NOT NULL,
            saved_at TEXT NOT NULL,
            body TEXT NOT NULL
        )",
    )
    .execute(&pool)
    .await?;

    debug!(url, "database ready");
    Ok(pool)
}

/// Create the named save slot if missing and return its id.
pub async fn create_save(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<i64, PersistError> {
    sqlx::query("INSERT OR IGNORE INTO saves (name, description, created_at) VALUES (?, ?, ?)")
        .bind(name)
        .bind(description)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    let id = sqlx::query_scalar::<_, i64>("SELECT id FROM saves WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(id)
}

/// Store `snapshot` as the latest one of `save_id`, dropping older rows.
pub async fn write_snapshot(
    pool: &SqlitePool,
    save_id: i64,
    snapshot: &Snapshot,
) -> Result<i64, PersistError> {
    let body = snapshot.to_json()?;
    let tick = i64::try_from(snapshot.tick).unwrap_or(i64::MAX);
    let saved_at = snapshot.saved_at.unwrap_or_else(Utc::now).to_rfc3339();

    let mut tx = pool.begin().await?;
    let row_id = sqlx::query(
        "INSERT INTO snapshots (save_id, tick, saved_at, body) VALUES (?, ?, ?, ?)",
    )
    .bind(save_id)
    .bind(tick)
    .bind(saved_at)
    .bind(body)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    sqlx::query("DELETE FROM snapshots WHERE save_id = ? AND id <> ?")
        .bind(save_id)
        .bind(row_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    debug!(save_id, tick, "snapshot stored");
    Ok(row_id)
}

/// Latest snapshot of `save_id`, repaired on load.
pub async fn latest_snapshot(
    pool: &SqlitePool,
    save_id: i64,
) -> Result<Option<Snapshot>, PersistError> {
    let body = sqlx::query_scalar::<_, String>(
        "SELECT body FROM snapshots WHERE save_id = ? ORDER BY id DESC LIMIT 1",
    )
    .bind(save_id)
    .fetch_optional(pool)
    .await?;

    match body {
        Some(text) => Ok(Some(Snapshot::from_json(&text)?)),
        None => Ok(None),
    }
}

/// Delete every snapshot of `save_id`; the save slot itself stays.
pub async fn clear_save(pool: &SqlitePool, save_id: i64) -> Result<u64, PersistError> {
    let res = sqlx::query("DELETE FROM snapshots WHERE save_id = ?")
        .bind(save_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

/// Blocking [`SnapshotStore`] over one named save in a SQLite database.
///
/// Owns a current-thread tokio runtime to drive sqlx.
pub struct SqliteStore {
    // Declared before the runtime so the pool is dropped first.
    pool: SqlitePool,
    save_id: i64,
    runtime: tokio::runtime::Runtime,
}

impl SqliteStore {
    pub fn open(url: &str, save_name: &str) -> Result<Self, PersistError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let pool = runtime.block_on(init_db(url))?;
        let save_id = runtime.block_on(create_save(&pool, save_name, None))?;
        Ok(Self {
            pool,
            save_id,
            runtime,
        })
    }

    pub fn save_id(&self) -> i64 {
        self.save_id
    }
}

impl SnapshotStore for SqliteStore {
    fn save(&mut self, snapshot: &Snapshot) -> Result<(), PersistError> {
        self.runtime
            .block_on(write_snapshot(&self.pool, self.save_id, snapshot))?;
        Ok(())
    }

    fn load(&mut self) -> Result<Option<Snapshot>, PersistError> {
        self.runtime
            .block_on(latest_snapshot(&self.pool, self.save_id))
    }

    fn reset(&mut self) -> Result<(), PersistError> {
        self.runtime.block_on(clear_save(&self.pool, self.save_id))?;
        Ok(())
    }
}
