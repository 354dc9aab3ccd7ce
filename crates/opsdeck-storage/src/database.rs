//! SQLite connection holding the session token table.
//!
//! The schema version lives in SQLite's `user_version` pragma. Each entry
//! of [`SCHEMA`] upgrades the file by one version and is applied together
//! with the version bump, so an interrupted upgrade is retried whole on the
//! next open.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Schema upgrades, index `n` takes the file from version `n` to `n + 1`.
const SCHEMA: &[(&str, &str)] = &[(
    "session token slots",
    include_str!("migrations/001_initial.sql"),
)];

/// How long a writer waits for another process holding the file lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create the database file and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create data directory {}", dir.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Cannot open token database {}", path.display()))?;
        // Readers in other processes never wait on a token write
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        debug!("[Database] Opened {}", path.display());
        Self::prepare(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        let db = Self { conn };
        db.upgrade()?;
        Ok(db)
    }

    fn upgrade(&self) -> Result<()> {
        let from = self.schema_version();

        for (version, (label, sql)) in SCHEMA.iter().enumerate().skip(from as usize) {
            let target = version as i64 + 1;
            info!("[Database] Upgrading schema to v{} ({})", target, label);

            self.transaction(|conn| {
                conn.execute_batch(sql)
                    .with_context(|| format!("Schema upgrade v{} failed", target))?;
                conn.pragma_update(None, "user_version", target)?;
                Ok(())
            })?;
        }

        Ok(())
    }

    /// Schema version recorded in the file (0 for a fresh database).
    pub fn schema_version(&self) -> i64 {
        self.conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` in a transaction, committing only if it succeeds.
    pub fn transaction<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
