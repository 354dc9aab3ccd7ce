//! # OpsDeck Core Library
//!
//! Domain types and ports shared by the OpsDeck dashboard client.
//!
//! ## Modules
//!
//! - `config` - Backend service names, endpoints and transport settings
//! - `domain` - Credentials, session, user profile and entity models
//! - `repository` - Durable token storage trait
//! - `navigation` - Sign-in redirect port
//! - `event_bus` - Session event distribution

pub mod config;
pub mod domain;
pub mod event_bus;
pub mod navigation;
pub mod repository;

// Re-export commonly used types
pub use config::*;
pub use domain::*;
pub use repository::*;

pub use event_bus::{EventBus, EventReceiver, EventSender};
pub use navigation::SignInRedirect;
