//! Key/value persistence for credentials cached across calls.
//!
//! The classifier never reads the store; only the [`Adext`](crate::Adext)
//! facade does, to remember a default access token.
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStore`] | Tests, short-lived processes |
//! | [`SqliteStore`] | Credentials that should survive a restart |
//!
//! [`MemoryStore`]: memory::MemoryStore
//! [`SqliteStore`]: sqlite::SqliteStore

pub mod memory;
pub mod sqlite;

use adext::AdextError;

/// Key under which the facade caches its default access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Errors that store operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An unexpected error in the underlying backend.
    #[error("internal store error: {0}")]
    Internal(String),
}

impl From<StoreError> for AdextError {
    fn from(e: StoreError) -> Self {
        AdextError::Store(e.to_string())
    }
}

/// String-keyed persistence. Thread-safety is part of the contract.
pub trait PersistentStore: Send + Sync {
    /// The value stored under `key`, or `None`.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}
