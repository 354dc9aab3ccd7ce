//! Credential Attacher - bearer header injection for outgoing requests

use std::sync::Arc;

use reqwest::RequestBuilder;

use crate::session::SessionStore;

/// Adds `Authorization: Bearer <access token>` to outgoing requests.
///
/// The token is read at send time, so requests already in flight keep the
/// token that was current when they left.
#[derive(Clone)]
pub struct CredentialAttacher {
    session: Arc<SessionStore>,
}

impl CredentialAttacher {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self { session }
    }

    /// Attach the current access token, if any.
    ///
    /// Returns the token that was attached so a later 401 can be matched
    /// against the session's current token.
    pub fn attach(&self, builder: RequestBuilder) -> (RequestBuilder, Option<String>) {
        match self
            .session
            .access_token()
            .filter(|token| !token.trim().is_empty())
        {
            Some(token) => (builder.bearer_auth(&token), Some(token)),
            None => (builder, None),
        }
    }
}
