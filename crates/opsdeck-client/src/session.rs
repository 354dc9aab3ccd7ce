//! Session Store - the single owner of the credential pair and identity
//!
//! All service clients read the current access token from here and the
//! refresh coordinator writes refreshed pairs back through [`SessionStore::rotate`].
//!
//! Writes are serialized by a writer lock and persisted before the in-memory
//! pair is swapped, so durable storage and memory never disagree and readers
//! only ever see a complete pair. Readers do not wait on storage I/O.

use std::sync::Arc;

use opsdeck_core::{CredentialPair, RepoResult, Session, StoredTokens, TokenRepository, UserProfile};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

pub struct SessionStore {
    state: RwLock<Session>,
    writer: Mutex<()>,
    storage: Arc<dyn TokenRepository>,
}

impl SessionStore {
    /// Create an empty, unauthenticated store.
    pub fn new(storage: Arc<dyn TokenRepository>) -> Self {
        Self {
            state: RwLock::new(Session::default()),
            writer: Mutex::new(()),
            storage,
        }
    }

    /// Rehydrate from durable storage.
    ///
    /// Only a complete pair restores an authenticated session. A missing
    /// slot or unreadable storage starts the session signed out.
    pub fn restore(storage: Arc<dyn TokenRepository>) -> Self {
        let store = Self::new(storage);

        match store.storage.load() {
            Ok(tokens) => match tokens.to_pair() {
                Some(pair) => {
                    info!("[SessionStore] Restored persisted session");
                    store.state.write().credentials = Some(pair);
                }
                None if tokens.is_empty() => {
                    debug!("[SessionStore] No persisted session");
                }
                None => {
                    warn!("[SessionStore] Persisted session is incomplete, starting signed out");
                }
            },
            Err(e) => {
                warn!(
                    "[SessionStore] Failed to read persisted session, starting signed out: {}",
                    e
                );
            }
        }

        store
    }

    /// Replace the credential pair and mark the session authenticated.
    ///
    /// The pair is persisted first; on a storage error the previous state
    /// is left untouched.
    pub fn set_credentials(&self, pair: CredentialPair) -> RepoResult<()> {
        let _writer = self.writer.lock();

        self.storage.save(&StoredTokens::from(&pair))?;
        self.state.write().credentials = Some(pair);

        debug!("[SessionStore] Credentials updated");
        Ok(())
    }

    /// Install the result of a token refresh.
    ///
    /// The refresh token is replaced only when the backend supplied a new
    /// one. Returns `false` without touching anything if the session was
    /// cleared in the meantime, so a refresh cannot resurrect a signed-out
    /// session.
    pub fn rotate(&self, access_token: String, refresh_token: Option<String>) -> RepoResult<bool> {
        let _writer = self.writer.lock();

        let Some(rotated) = self
            .state
            .read()
            .credentials
            .as_ref()
            .map(|current| current.rotate(access_token, refresh_token))
        else {
            return Ok(false);
        };

        self.storage.save(&StoredTokens::from(&rotated))?;
        self.state.write().credentials = Some(rotated);

        debug!("[SessionStore] Credentials rotated");
        Ok(true)
    }

    /// Replace the signed-in user's profile. Independent of credentials.
    pub fn set_identity(&self, profile: UserProfile) {
        self.state.write().identity = Some(profile);
    }

    /// Drop credentials and identity and remove the persisted slots.
    ///
    /// Idempotent. Memory is cleared even if storage removal fails.
    pub fn clear(&self) {
        let _writer = self.writer.lock();

        if let Err(e) = self.storage.clear() {
            warn!("[SessionStore] Failed to remove persisted session: {}", e);
        }

        let mut state = self.state.write();
        if state.credentials.is_some() || state.identity.is_some() {
            *state = Session::default();
            info!("[SessionStore] Session cleared");
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .credentials
            .as_ref()
            .map(|c| c.access_token().to_string())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .credentials
            .as_ref()
            .map(|c| c.refresh_token().to_string())
    }

    pub fn identity(&self) -> Option<UserProfile> {
        self.state.read().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().is_authenticated()
    }

    /// Consistent copy of the whole session.
    pub fn snapshot(&self) -> Session {
        self.state.read().clone()
    }
}
