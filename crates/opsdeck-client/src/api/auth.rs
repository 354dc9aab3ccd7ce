//! Auth service API: registration, sign-in, profile and sign-out

use std::sync::Arc;

use opsdeck_core::{
    CredentialPair, EventSender, LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse,
    SessionEvent, TokenResponse, UserProfile,
};
use tracing::{info, warn};
use zeroize::Zeroizing;

use crate::client::ServiceClient;
use crate::error::ApiError;
use crate::request::ApiRequest;
use crate::session::SessionStore;

const REGISTER_PATH: &str = "api/v1/register";
const LOGIN_PATH: &str = "api/v1/login";
const LOGOUT_PATH: &str = "api/v1/logout";
const PROFILE_PATH: &str = "api/v1/auth/profile";

#[derive(Clone)]
pub struct AuthApi {
    client: Arc<ServiceClient>,
    session: Arc<SessionStore>,
    events: Option<EventSender>,
}

impl AuthApi {
    pub fn new(
        client: Arc<ServiceClient>,
        session: Arc<SessionStore>,
        events: Option<EventSender>,
    ) -> Self {
        Self {
            client,
            session,
            events,
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            events.emit(event);
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let request = ApiRequest::post(REGISTER_PATH).json(request)?.anonymous();
        self.client.json(&request).await
    }

    /// Sign in and establish the session.
    ///
    /// The profile is fetched afterwards; if that fails the session stays
    /// authenticated without an identity and `load_profile` can retry.
    pub async fn login(&self, request: &LoginRequest) -> Result<Option<UserProfile>, ApiError> {
        let api_request = ApiRequest::post(LOGIN_PATH).json(request)?.anonymous();
        let tokens: TokenResponse = self.client.json(&api_request).await?;

        let refresh_token = tokens
            .refresh_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("login returned no refresh_token".into()))?;
        if tokens.access_token.trim().is_empty() {
            return Err(ApiError::InvalidResponse(
                "login returned an empty access_token".into(),
            ));
        }

        self.session
            .set_credentials(CredentialPair::new(tokens.access_token, refresh_token))?;
        info!("[Auth] Signed in as {}", request.email);

        let identity = match self.load_profile().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("[Auth] Signed in but failed to load profile: {}", e);
                None
            }
        };

        self.emit(SessionEvent::SignedIn {
            username: identity.as_ref().map(|p| p.username.clone()),
        });

        Ok(identity)
    }

    /// `GET /api/v1/auth/profile` without touching the session.
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        self.client.json(&ApiRequest::get(PROFILE_PATH)).await
    }

    /// Fetch the profile and store it as the session identity.
    pub async fn load_profile(&self) -> Result<UserProfile, ApiError> {
        let profile = self.profile().await?;
        self.session.set_identity(profile.clone());
        Ok(profile)
    }

    /// Sign out. Always leaves the session cleared.
    ///
    /// The server-side revocation is best effort; its failure is only logged.
    pub async fn logout(&self) {
        if let Some(refresh_token) = self.session.refresh_token().map(Zeroizing::new) {
            let result = ApiRequest::post(LOGOUT_PATH)
                .json(&RefreshRequest {
                    refresh_token: &refresh_token,
                })
                .map(ApiRequest::anonymous);

            let result = match result {
                Ok(request) => self.client.execute(&request).await,
                Err(e) => Err(e),
            };

            if let Err(e) = result {
                warn!("[Auth] Logout request failed: {}", e);
            }
        }

        self.session.clear();
        info!("[Auth] Signed out");
        self.emit(SessionEvent::SignedOut);
    }
}
