//! Auth API integration tests

mod login;
