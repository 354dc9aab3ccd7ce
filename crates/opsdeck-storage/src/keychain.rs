//! OS Keychain token storage.
//!
//! Uses the platform-native secure storage:
//! - Windows: Credential Manager
//! - macOS: Keychain
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! Both slots are serialized into a single keychain secret so a save is
//! one write; there is no window where only one slot is updated.

use anyhow::{Context, Result};
use keyring::Entry;
use opsdeck_core::{StoredTokens, TokenRepository};
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// Keychain service name for OpsDeck entries.
pub const KEYCHAIN_SERVICE: &str = "com.opsdeck.dashboard";

/// Keychain account holding the session token slots.
const SESSION_ENTRY_NAME: &str = "session-tokens";

/// Keychain-backed token repository.
pub struct KeychainTokenRepository {
    entry: Entry,
}

impl KeychainTokenRepository {
    pub fn new() -> Result<Self> {
        Self::with_names(KEYCHAIN_SERVICE, SESSION_ENTRY_NAME)
    }

    /// Create with a custom service and entry name (separate profiles, tests).
    pub fn with_names(service: &str, entry_name: &str) -> Result<Self> {
        let entry =
            Entry::new(service, entry_name).context("Failed to create keychain entry")?;

        Ok(Self { entry })
    }
}

impl TokenRepository for KeychainTokenRepository {
    fn load(&self) -> Result<StoredTokens> {
        match self.entry.get_password() {
            Ok(secret) => {
                let secret = Zeroizing::new(secret);
                match serde_json::from_str::<StoredTokens>(&secret) {
                    Ok(tokens) => {
                        debug!("[Keychain] Loaded session tokens");
                        Ok(tokens)
                    }
                    Err(e) => {
                        // Unreadable entry: treat as signed out rather than fail startup
                        warn!("[Keychain] Ignoring malformed session entry: {}", e);
                        Ok(StoredTokens::default())
                    }
                }
            }
            Err(keyring::Error::NoEntry) => {
                debug!("[Keychain] No session entry");
                Ok(StoredTokens::default())
            }
            Err(e) => Err(anyhow::anyhow!("Failed to access keychain: {}", e)),
        }
    }

    fn save(&self, tokens: &StoredTokens) -> Result<()> {
        if tokens.is_empty() {
            return self.clear();
        }

        let secret = Zeroizing::new(serde_json::to_string(tokens)?);
        self.entry
            .set_password(&secret)
            .context("Failed to store session tokens in keychain")?;

        debug!("[Keychain] Saved session tokens");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry.delete_credential() {
            Ok(()) => {
                info!("[Keychain] Session tokens deleted");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("[Keychain] No session entry to delete");
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Failed to delete session tokens from keychain: {}",
                e
            )),
        }
    }
}
