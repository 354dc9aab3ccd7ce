//! Client error types
//!
//! Every failure reaching a caller is an [`ApiError`] whose `Display` is the
//! user-facing message. Refresh failures are internal to the coordinator:
//! callers waiting on a refresh always see their own original
//! `AuthenticationExpired`, never a [`RefreshError`].

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Fallback message when the server gives nothing better.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred";

#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure, timeout, or connection refused
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success response unrelated to authentication
    #[error("{message}")]
    Status { status: u16, message: String },

    /// The backend rejected the presented credential (HTTP 401)
    #[error("{message}")]
    AuthenticationExpired { message: String },

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::AuthenticationExpired { .. } => Some(StatusCode::UNAUTHORIZED.as_u16()),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_authentication_expired(&self) -> bool {
        matches!(self, Self::AuthenticationExpired { .. })
    }

    /// Build the error for a non-success response.
    ///
    /// The message is the body's `error` field, then its `message` field,
    /// then the status reason phrase.
    pub(crate) fn from_response_parts(status: StatusCode, body: &[u8]) -> Self {
        let message = error_message(status, body);
        if status == StatusCode::UNAUTHORIZED {
            Self::AuthenticationExpired { message }
        } else {
            Self::Status {
                status: status.as_u16(),
                message,
            }
        }
    }

    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        match response.bytes().await {
            Ok(body) => Self::from_response_parts(status, &body),
            Err(_) => Self::from_response_parts(status, &[]),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error.or(b.message))
        .filter(|m| !m.trim().is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string())
}

/// Why a refresh attempt did not produce a usable credential pair.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("refresh request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("refresh rejected with HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid refresh response: {0}")]
    InvalidResponse(String),

    #[error("failed to store refreshed tokens: {0}")]
    Storage(anyhow::Error),

    #[error("session was cleared while the refresh was in flight")]
    SessionCleared,
}
