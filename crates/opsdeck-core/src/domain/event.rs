//! Session events
//!
//! Facts about the session lifecycle, published on the event bus for
//! whichever host is embedding the client (UI shell, console, tests).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Credentials were stored after a successful login
    SignedIn { username: Option<String> },
    /// The access token was replaced by a refresh
    TokensRefreshed,
    /// The session was cleared by an explicit logout
    SignedOut,
    /// The session is unrecoverable; the user must sign in again
    SignInRequired,
}

impl SessionEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::SignedIn { .. } => "signed_in",
            Self::TokensRefreshed => "tokens_refreshed",
            Self::SignedOut => "signed_out",
            Self::SignInRequired => "sign_in_required",
        }
    }
}
