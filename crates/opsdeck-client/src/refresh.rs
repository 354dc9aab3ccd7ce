//! Refresh Coordinator - single-flight token refresh shared by every client
//!
//! ```text
//!            401 (refresh token present)
//!   ┌──────┐ ─────────────────────────────▶ ┌────────────┐
//!   │ Idle │                                │ Refreshing │◀── further 401s queue here
//!   └──────┘ ◀───────────────────────────── └────────────┘
//!             refresh settled: waiters released FIFO
//! ```
//!
//! At most one refresh call is in flight per session. The refresh runs on
//! its own task, so dropping the request that triggered it cannot leave the
//! coordinator stuck in `Refreshing`.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use opsdeck_core::{EventSender, RefreshRequest, SessionEvent, SignInRedirect, TokenResponse};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;
use zeroize::Zeroizing;

use crate::error::{ApiError, RefreshError};
use crate::session::SessionStore;

/// Path of the refresh endpoint on the auth service
pub const REFRESH_PATH: &str = "api/v1/refresh";

/// Exchanges a refresh token for a new token pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, RefreshError>;
}

/// Calls `POST {auth}/api/v1/refresh` directly.
///
/// Deliberately bypasses the credential attacher and the coordinator:
/// a rejected refresh must settle the refresh, not start another one.
pub struct HttpTokenRefresher {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpTokenRefresher {
    pub fn new(http: reqwest::Client, endpoint: Url) -> Self {
        Self { http, endpoint }
    }

    /// Build for an auth service base URL.
    pub fn for_auth_service(http: reqwest::Client, auth_base: &Url) -> Result<Self, ApiError> {
        let endpoint = crate::client::join_path(auth_base, REFRESH_PATH)?;
        Ok(Self::new(http, endpoint))
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, RefreshError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = ApiError::from_response(response).await.to_string();
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        let tokens: TokenResponse = serde_json::from_slice(&body)
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        if tokens.access_token.trim().is_empty() {
            return Err(RefreshError::InvalidResponse(
                "empty access_token".to_string(),
            ));
        }

        Ok(tokens)
    }
}

/// Result handed to every request that waited on a refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The session holds a new access token; retry once.
    Refreshed,
    /// The session is gone; surface the original authentication error.
    Failed,
}

enum State {
    Idle,
    Refreshing {
        waiters: VecDeque<oneshot::Sender<RefreshOutcome>>,
    },
}

pub struct RefreshCoordinator {
    session: Arc<SessionStore>,
    refresher: Arc<dyn TokenRefresher>,
    redirect: Arc<dyn SignInRedirect>,
    events: Option<EventSender>,
    state: Mutex<State>,
}

impl RefreshCoordinator {
    pub fn new(
        session: Arc<SessionStore>,
        refresher: Arc<dyn TokenRefresher>,
        redirect: Arc<dyn SignInRedirect>,
    ) -> Self {
        Self {
            session,
            refresher,
            redirect,
            events: None,
            state: Mutex::new(State::Idle),
        }
    }

    /// Publish `TokensRefreshed` on this bus after each successful refresh.
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock(), State::Refreshing { .. })
    }

    /// Handle an authentication failure for a request sent with `sent_token`.
    ///
    /// Resolves once the caller may retry (`Refreshed`) or must give up
    /// (`Failed`). Never issues more than one refresh call at a time.
    pub async fn recover(self: &Arc<Self>, sent_token: Option<&str>) -> RefreshOutcome {
        let (tx, rx) = oneshot::channel();

        {
            let mut state = self.state.lock();

            if let State::Refreshing { waiters } = &mut *state {
                waiters.push_back(tx);
                debug!(
                    queued = waiters.len(),
                    "[RefreshCoordinator] Refresh in flight, queued request"
                );
            } else {
                let current = self.session.access_token();
                match (current.as_deref(), sent_token) {
                    (Some(current), sent) if Some(current) != sent => {
                        debug!("[RefreshCoordinator] Token already rotated, retrying");
                        return RefreshOutcome::Refreshed;
                    }
                    (None, Some(_)) => {
                        debug!("[RefreshCoordinator] Session already cleared");
                        return RefreshOutcome::Failed;
                    }
                    _ => {}
                }

                let Some(refresh_token) = self.session.refresh_token().map(Zeroizing::new) else {
                    drop(state);
                    warn!("[RefreshCoordinator] No refresh token, sign-in required");
                    return self.sign_out();
                };

                *state = State::Refreshing {
                    waiters: VecDeque::from([tx]),
                };

                let this = Arc::clone(self);
                tokio::spawn(async move {
                    this.run_refresh(refresh_token).await;
                });
            }
        }

        // Every queued sender is answered by `release`; a bare drop fails closed
        rx.await.unwrap_or(RefreshOutcome::Failed)
    }

    async fn run_refresh(&self, refresh_token: Zeroizing<String>) {
        info!("[RefreshCoordinator] Access token rejected, refreshing");
        let guard = SettleOnExit {
            coordinator: self,
            settled: false,
        };

        let result = match self.refresher.refresh(&refresh_token).await {
            Ok(tokens) => match self
                .session
                .rotate(tokens.access_token.clone(), tokens.refresh_token.clone())
            {
                Ok(true) => Ok(()),
                Ok(false) => Err(RefreshError::SessionCleared),
                Err(e) => Err(RefreshError::Storage(e)),
            },
            Err(e) => Err(e),
        };

        let outcome = match result {
            Ok(()) => {
                info!("[RefreshCoordinator] Token refresh successful");
                if let Some(events) = &self.events {
                    events.emit(SessionEvent::TokensRefreshed);
                }
                RefreshOutcome::Refreshed
            }
            Err(e) => {
                warn!("[RefreshCoordinator] Token refresh failed: {}", e);
                self.sign_out()
            }
        };

        guard.settle(outcome);
    }

    fn sign_out(&self) -> RefreshOutcome {
        self.session.clear();
        self.redirect.redirect_to_sign_in();
        RefreshOutcome::Failed
    }

    /// Return to `Idle` and hand `outcome` to every queued request.
    fn release(&self, outcome: RefreshOutcome) {
        let waiters = match std::mem::replace(&mut *self.state.lock(), State::Idle) {
            State::Refreshing { waiters } => waiters,
            State::Idle => VecDeque::new(),
        };

        debug!(
            waiters = waiters.len(),
            ?outcome,
            "[RefreshCoordinator] Releasing queued requests"
        );

        for waiter in waiters {
            // Receiver gone means the caller stopped waiting
            let _ = waiter.send(outcome);
        }
    }
}

/// Releases the queue with `Failed` if the refresh task unwinds or is
/// dropped before reaching an outcome.
struct SettleOnExit<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl SettleOnExit<'_> {
    fn settle(mut self, outcome: RefreshOutcome) {
        self.settled = true;
        self.coordinator.release(outcome);
    }
}

impl Drop for SettleOnExit<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        warn!("[RefreshCoordinator] Refresh task ended without an outcome");
        let outcome = self.coordinator.sign_out();
        self.coordinator.release(outcome);
    }
}
