//! Repository implementations

mod token_repository;

pub use token_repository::SqliteTokenRepository;
