//! OpsDeck Storage Layer
//!
//! Durable backends for the session token slots.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               SessionStore                   │
//! ├──────────────────────────────────────────────┤
//! │        TokenRepository (opsdeck-core)        │
//! ├──────────────────────┬───────────────────────┤
//! │ SqliteTokenRepository│ KeychainTokenRepository│
//! │   (session_tokens)   │  (OS secure storage)  │
//! └──────────────────────┴───────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use opsdeck_storage::{default_database_path, Database, SqliteTokenRepository};
//! use parking_lot::Mutex;
//! use std::sync::Arc;
//!
//! let db = Database::open(&default_database_path().unwrap())?;
//! let tokens = SqliteTokenRepository::new(Arc::new(Mutex::new(db)));
//! ```

mod database;
pub mod keychain;
mod repositories;

pub use database::Database;
pub use keychain::{KeychainTokenRepository, KEYCHAIN_SERVICE};
pub use repositories::*;

/// Default database file name.
pub const DATABASE_FILE: &str = "opsdeck.db";

/// Get the default database path for the current platform.
pub fn default_database_path() -> Option<std::path::PathBuf> {
    dirs::data_local_dir().map(|p| p.join("opsdeck").join(DATABASE_FILE))
}
