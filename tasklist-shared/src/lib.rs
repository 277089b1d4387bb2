//! # Tasklist Shared Library
//!
//! Data layer and domain logic used by the tasklist API server.
//!
//! ## Module Organization
//!
//! - `db`: SQLite pool and embedded migrations
//! - `models`: Users, access tokens and tasks
//! - `auth`: Password hashing, bearer tokens, request authentication
//! - `storage`: Attachment file area
//! - `reconcile`: Applying partial updates to a task

pub mod auth;
pub mod db;
pub mod models;
pub mod reconcile;
pub mod storage;

/// Current version of the tasklist shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
