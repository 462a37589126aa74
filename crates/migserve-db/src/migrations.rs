use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use migserve_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use tracing::{debug, info};

use crate::dir::{collect_sql_files, migration_id, validate_migration_path};

/// Whether `apply` ran a script or found it already recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    Executed,
    AlreadyExecuted,
}

/// A row of the `_migrations` tracking table.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedMigration {
    pub id: String,
    pub applied_at: DateTime<Utc>,
}

/// Applies SQL scripts to a SQLite database at most once per id.
///
/// Applied ids are recorded in a `_migrations` table, created on open.
pub struct MigrationStore {
    conn: Mutex<Connection>,
}

impl MigrationStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening migration store at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_tracking_table()?;
        Ok(store)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("migration store lock poisoned".into()))
    }

    fn create_tracking_table(&self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            );",
        )
        .map_err(|e| Error::Database(format!("failed to create tracking table: {e}")))?;
        Ok(())
    }

    /// Apply a script supplied directly by the caller. Unlike files and
    /// remote listings, an empty script here is rejected.
    pub fn apply_content(&self, id: &str, script: &str) -> Result<MigrationOutcome> {
        if script.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "migration script for `{id}` is empty"
            )));
        }
        self.apply(id, script)
    }

    /// Run `script` under `id` unless that id was already applied.
    ///
    /// The script and its tracking row commit together or not at all. An
    /// empty script is recorded as applied without running anything.
    pub fn apply(&self, id: &str, script: &str) -> Result<MigrationOutcome> {
        if id.trim().is_empty() {
            return Err(Error::InvalidInput("migration id is empty".into()));
        }

        let mut conn = self.connection()?;
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(format!("failed to begin transaction: {e}")))?;

        let seen = tx
            .query_row(
                "SELECT 1 FROM _migrations WHERE id = ?1",
                params![id],
                |_| Ok(()),
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to check migration {id}: {e}")))?;
        if seen.is_some() {
            debug!("migration {} already applied, skipping", id);
            return Ok(MigrationOutcome::AlreadyExecuted);
        }

        if script.trim().is_empty() {
            debug!("migration {} is empty, recording only", id);
        } else {
            tx.execute_batch(script)
                .map_err(|e| Error::Migration(format!("{id}: {e}")))?;
        }
        tx.execute(
            "INSERT INTO _migrations (id, applied_at) VALUES (?1, ?2)",
            params![id, Utc::now()],
        )
        .map_err(|e| Error::Database(format!("failed to record migration {id}: {e}")))?;
        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit migration {id}: {e}")))?;

        info!("applied migration {}", id);
        Ok(MigrationOutcome::Executed)
    }

    /// Apply every `.sql` file under `path` in file-name order.
    ///
    /// Returns `true` if at least one new migration ran.
    pub fn apply_dir(&self, path: &Path) -> Result<bool> {
        validate_migration_path(path)?;

        let files = collect_sql_files(path)?;
        if files.is_empty() {
            info!("no migration files found in {}", path.display());
            return Ok(false);
        }

        let mut did_new_migration = false;
        for file in files {
            let id = migration_id(path, &file);
            let script = std::fs::read_to_string(&file).map_err(|e| {
                Error::Migration(format!("unable to read {}: {e}", file.display()))
            })?;

            if self.apply(&id, &script)? == MigrationOutcome::Executed {
                did_new_migration = true;
            }
        }

        Ok(did_new_migration)
    }

    /// Applied migrations in the order they ran.
    pub fn applied(&self) -> Result<Vec<AppliedMigration>> {
        let conn = self.connection()?;
        let mut stmt = conn
            .prepare("SELECT id, applied_at FROM _migrations ORDER BY seq ASC")
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok(AppliedMigration {
                    id: row.get(0)?,
                    applied_at: row.get(1)?,
                })
            })
            .map_err(|e| Error::Database(format!("failed to query migrations: {e}")))?;

        let mut applied = Vec::new();
        for row in rows {
            applied.push(
                row.map_err(|e| Error::Database(format!("failed to read migration row: {e}")))?,
            );
        }
        Ok(applied)
    }

    pub fn is_applied(&self, id: &str) -> Result<bool> {
        let conn = self.connection()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM _migrations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(|e| Error::Database(format!("failed to check migration {id}: {e}")))?;
        Ok(count > 0)
    }

    /// Run a read-only query returning a single integer. Used by callers
    /// that need to inspect the migrated schema.
    pub fn query_i64(&self, sql: &str) -> Result<i64> {
        let conn = self.connection()?;
        conn.query_row(sql, [], |row| row.get(0))
            .map_err(|e| Error::Database(format!("query failed: {e}")))
    }
}
