//! Domain entities and value objects
//!
//! - Credentials and session state (CredentialPair, StoredTokens, Session)
//! - Session lifecycle events
//! - Auth service payloads
//! - CRUD entities served by the user, product, task and media services

mod auth;
mod credential;
mod entity;
mod event;
mod media;
mod product;
mod session;
mod task;
mod user;

pub use auth::*;
pub use credential::*;
pub use entity::*;
pub use event::SessionEvent;
pub use media::*;
pub use product::*;
pub use session::*;
pub use task::*;
pub use user::*;
