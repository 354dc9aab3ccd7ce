//! SQLite implementation of TokenRepository.
//!
//! Each slot is a row in `session_tokens`. Both rows are written or removed
//! inside one transaction, so a reader opening the database mid-update sees
//! either the old pair or the new one.

use std::sync::Arc;

use anyhow::Result;
use opsdeck_core::{StoredTokens, TokenRepository, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::Database;

/// SQLite-backed token repository.
pub struct SqliteTokenRepository {
    db: Arc<Mutex<Database>>,
}

impl SqliteTokenRepository {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    fn read_slot(conn: &Connection, key: &str) -> Result<Option<String>> {
        let value = conn
            .query_row(
                "SELECT value FROM session_tokens WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write_slot(conn: &Connection, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => {
                conn.execute(
                    "INSERT INTO session_tokens (key, value, updated_at)
                     VALUES (?, ?, datetime('now'))
                     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                    params![key, value],
                )?;
            }
            None => {
                conn.execute("DELETE FROM session_tokens WHERE key = ?", params![key])?;
            }
        }
        Ok(())
    }
}

impl TokenRepository for SqliteTokenRepository {
    fn load(&self) -> Result<StoredTokens> {
        let db = self.db.lock();
        let conn = db.connection();

        Ok(StoredTokens {
            access_token: Self::read_slot(conn, ACCESS_TOKEN_KEY)?,
            refresh_token: Self::read_slot(conn, REFRESH_TOKEN_KEY)?,
        })
    }

    fn save(&self, tokens: &StoredTokens) -> Result<()> {
        let db = self.db.lock();
        db.transaction(|conn| {
            Self::write_slot(conn, ACCESS_TOKEN_KEY, tokens.access_token.as_deref())?;
            Self::write_slot(conn, REFRESH_TOKEN_KEY, tokens.refresh_token.as_deref())?;
            Ok(())
        })?;

        debug!("[TokenRepository] Saved session tokens");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let db = self.db.lock();
        let removed = db.transaction(|conn| {
            Ok(conn.execute(
                "DELETE FROM session_tokens WHERE key IN (?, ?)",
                params![ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY],
            )?)
        })?;

        debug!(removed, "[TokenRepository] Cleared session tokens");
        Ok(())
    }
}
