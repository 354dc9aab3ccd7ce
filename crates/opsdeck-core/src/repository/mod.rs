//! Repository traits for durable session storage
//!
//! The session survives process restarts through two string slots,
//! `access_token` and `refresh_token`. Implementations live in
//! `opsdeck-storage` (SQLite, OS keychain); tests use in-memory mocks.

use crate::domain::StoredTokens;

/// Result type for repository operations
pub type RepoResult<T> = anyhow::Result<T>;

/// Durable token storage.
///
/// Calls are synchronous: the session store persists a new pair before it
/// becomes visible to readers, so a reload never sees a half-written pair.
/// `save` must write both slots as one unit.
pub trait TokenRepository: Send + Sync {
    /// Read both slots. Missing slots are `None`, not an error.
    fn load(&self) -> RepoResult<StoredTokens>;

    /// Overwrite both slots.
    fn save(&self, tokens: &StoredTokens) -> RepoResult<()>;

    /// Remove both slots. Clearing empty storage succeeds.
    fn clear(&self) -> RepoResult<()>;
}
