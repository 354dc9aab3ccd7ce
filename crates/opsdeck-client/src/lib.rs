//! OpsDeck Client
//!
//! HTTP clients for the OpsDeck backends sharing one credential session:
//! - Session store with write-through persistence
//! - Bearer credential attachment on every authenticated request
//! - Single-flight token refresh with FIFO replay of queued requests
//! - Client registry for the built-in and additional services
//! - Typed auth and entity APIs

pub mod api;
pub mod attach;
pub mod client;
pub mod error;
pub mod refresh;
pub mod registry;
pub mod request;
pub mod session;

pub use api::{AuthApi, EntityClient};
pub use attach::CredentialAttacher;
pub use client::ServiceClient;
pub use error::{ApiError, RefreshError, DEFAULT_ERROR_MESSAGE};
pub use refresh::{HttpTokenRefresher, RefreshCoordinator, RefreshOutcome, TokenRefresher};
pub use registry::{ClientRegistry, ClientRegistryBuilder};
pub use request::ApiRequest;
pub use session::SessionStore;
