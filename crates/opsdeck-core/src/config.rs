//! Backend service configuration
//!
//! The dashboard talks to five independent backends. Each has a base URL
//! that defaults to a local development port and can be overridden through
//! the environment (`OPSDECK_API_<NAME>_URL`).

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Names of the built-in backend services.
pub mod services {
    pub const AUTH: &str = "auth";
    pub const USER: &str = "user";
    pub const PRODUCT: &str = "product";
    pub const TASK: &str = "task";
    pub const MEDIA: &str = "media";

    /// Built-in services with their local development ports
    pub const BUILTIN: [(&str, u16); 5] = [
        (AUTH, 3001),
        (USER, 3002),
        (PRODUCT, 3003),
        (TASK, 3004),
        (MEDIA, 3005),
    ];
}

/// Default transport timeout, applied to every call including refresh
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding the transport timeout (seconds)
pub const TIMEOUT_ENV: &str = "OPSDECK_HTTP_TIMEOUT_SECS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {source}")]
    InvalidUrl {
        var: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{var} must be a positive whole number of seconds, got {value:?}")]
    InvalidTimeout { var: String, value: String },
}

/// A named backend and where to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub name: String,
    pub base_url: Url,
}

impl ServiceEndpoint {
    pub fn new(name: impl Into<String>, base_url: Url) -> Self {
        Self {
            name: name.into(),
            base_url,
        }
    }

    /// Environment variable that overrides this service's base URL.
    pub fn env_var(name: &str) -> String {
        format!("OPSDECK_API_{}_URL", name.to_ascii_uppercase())
    }

    fn local(name: &str, port: u16) -> Self {
        let base_url =
            Url::parse(&format!("http://localhost:{}", port)).expect("Invalid localhost URL");
        Self::new(name, base_url)
    }
}

/// Settings shared by every service client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoints: Vec<ServiceEndpoint>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: services::BUILTIN
                .iter()
                .map(|(name, port)| ServiceEndpoint::local(name, *port))
                .collect(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("OpsDeck/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Build from process environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        for endpoint in &mut config.endpoints {
            let var = ServiceEndpoint::env_var(&endpoint.name);
            if let Some(value) = lookup(&var).filter(|v| !v.trim().is_empty()) {
                endpoint.base_url = Url::parse(value.trim())
                    .map_err(|source| ConfigError::InvalidUrl { var, source })?;
            }
        }

        if let Some(value) = lookup(TIMEOUT_ENV).filter(|v| !v.trim().is_empty()) {
            let secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout {
                    var: TIMEOUT_ENV.to_string(),
                    value: value.clone(),
                })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Base URL for a service, if configured.
    pub fn endpoint(&self, name: &str) -> Option<&Url> {
        self.endpoints
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.base_url)
    }

    /// Add or replace a service endpoint.
    pub fn with_endpoint(mut self, name: impl Into<String>, base_url: Url) -> Self {
        let name = name.into();
        match self.endpoints.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.base_url = base_url,
            None => self.endpoints.push(ServiceEndpoint::new(name, base_url)),
        }
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
