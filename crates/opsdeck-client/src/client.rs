//! Service Client - HTTP access to one backend service

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::attach::CredentialAttacher;
use crate::error::ApiError;
use crate::refresh::{RefreshCoordinator, RefreshOutcome};
use crate::request::ApiRequest;

/// Resolve `path` against a service base URL, keeping the base's own path.
pub(crate) fn join_path(base: &Url, path: &str) -> Result<Url, ApiError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let with_slash = format!("{}/", base.path());
        base.set_path(&with_slash);
    }
    Ok(base.join(path.trim_start_matches('/'))?)
}

/// Client for a single named service.
///
/// Every client built by a [`ClientRegistry`](crate::ClientRegistry) shares
/// the same session, attacher and refresh coordinator.
pub struct ServiceClient {
    name: String,
    base_url: Url,
    http: reqwest::Client,
    attacher: CredentialAttacher,
    coordinator: Arc<RefreshCoordinator>,
}

impl ServiceClient {
    pub(crate) fn new(
        name: impl Into<String>,
        base_url: Url,
        http: reqwest::Client,
        attacher: CredentialAttacher,
        coordinator: Arc<RefreshCoordinator>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url,
            http,
            attacher,
            coordinator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build(&self, request: &ApiRequest) -> Result<reqwest::RequestBuilder, ApiError> {
        let url = join_path(&self.base_url, &request.path)?;
        let mut builder = self.http.request(request.method.clone(), url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder)
    }

    /// Send a request and return the successful response.
    ///
    /// On a 401 the request is handed to the refresh coordinator and, if a
    /// refresh succeeded, sent once more with the new token. A second 401
    /// is returned as is. Anonymous requests are never retried.
    pub async fn send(&self, request: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let (response, sent_token) = self.dispatch(request).await?;

        if response.status() != StatusCode::UNAUTHORIZED || request.anonymous {
            return check(response).await;
        }

        // Keep the caller's own error; waiters never see the refresh failure
        let original = ApiError::from_response(response).await;

        debug!(
            "[{}] {} {} rejected with 401",
            self.name, request.method, request.path
        );

        match self.coordinator.recover(sent_token.as_deref()).await {
            RefreshOutcome::Refreshed => {
                let (retried, _) = self.dispatch(request).await?;
                if retried.status() == StatusCode::UNAUTHORIZED {
                    warn!(
                        "[{}] {} {} still unauthorized after refresh",
                        self.name, request.method, request.path
                    );
                }
                check(retried).await
            }
            RefreshOutcome::Failed => Err(original),
        }
    }

    async fn dispatch(
        &self,
        request: &ApiRequest,
    ) -> Result<(reqwest::Response, Option<String>), ApiError> {
        let builder = self.build(request)?;
        let (builder, sent_token) = if request.anonymous {
            (builder, None)
        } else {
            self.attacher.attach(builder)
        };

        let response = builder.send().await?;
        Ok((response, sent_token))
    }

    /// Send and decode a JSON body.
    pub async fn json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let response = self.send(request).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Send and discard the body.
    pub async fn execute(&self, request: &ApiRequest) -> Result<(), ApiError> {
        self.send(request).await?;
        Ok(())
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response).await)
    }
}
