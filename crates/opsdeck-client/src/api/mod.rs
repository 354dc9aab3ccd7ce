//! Typed APIs over the service clients

mod auth;
mod entity;

pub use auth::AuthApi;
pub use entity::EntityClient;
