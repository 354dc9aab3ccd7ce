//! Session entity - the credential pair plus the authenticated identity

use serde::{Deserialize, Serialize};

use super::CredentialPair;

/// Profile of the signed-in user, as returned by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: u64,
    pub email: String,
    pub username: String,
    pub is_active: bool,
}

/// Point-in-time view of the client session.
///
/// `identity` may lag behind `credentials`: the profile is fetched after the
/// tokens are stored and that fetch can fail on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub credentials: Option<CredentialPair>,
    pub identity: Option<UserProfile>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }
}
