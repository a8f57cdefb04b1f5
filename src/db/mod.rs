//! Identity Store Backends
//! Mission: Durable username -> identity record mapping behind an injectable client
//!
//! The store client is constructed once at startup and handed to the
//! credential store as `Arc<dyn UserRepository>`, so tests can swap in
//! [`InMemoryUserRepository`] without any process-wide state.

pub mod memory;
pub mod sqlite;

use crate::auth::models::IdentityRecord;
use async_trait::async_trait;
use std::time::Duration;

pub use memory::InMemoryUserRepository;
pub use sqlite::{PoolOptions, SqliteUserRepository};

/// Store-level failures. `NotFound` and `Duplicate` are outcomes the
/// credential store branches on; everything else is an I/O fault.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no identity record matches")]
    NotFound,
    #[error("username already taken")]
    Duplicate,
    #[error("store call exceeded {0:?}")]
    Timeout(Duration),
    #[error("connection pool: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("sqlite: {0}")]
    Sqlite(rusqlite::Error),
    #[error("store task aborted: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
            // Only the username UNIQUE index; NOT NULL and CHECK failures are faults.
            rusqlite::Error::SqliteFailure(ref e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                StoreError::Duplicate
            }
            other => StoreError::Sqlite(other),
        }
    }
}

/// Relational store client for identity records.
///
/// Records are immutable once inserted; there is deliberately no update or
/// delete.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Exact, case-sensitive match on username.
    async fn find_by_username(&self, username: &str) -> Result<IdentityRecord, StoreError>;

    /// Insert a new record. The store assigns `id` and `created_at`.
    /// Must fail with [`StoreError::Duplicate`] when the username exists,
    /// even if a concurrent caller inserted it after our existence check.
    async fn insert(&self, username: &str, password_hash: &str)
        -> Result<IdentityRecord, StoreError>;

    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}
