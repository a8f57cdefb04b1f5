//! In-memory identity store, used as a test double for the SQLite backend.

use super::{StoreError, UserRepository};
use crate::auth::models::IdentityRecord;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Default)]
struct Inner {
    next_id: i64,
    by_username: HashMap<String, IdentityRecord>,
}

/// Mirrors the SQLite backend's semantics: ids start at 1 and the username
/// is a unique key.
#[derive(Default)]
pub struct InMemoryUserRepository {
    inner: Mutex<Inner>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_username.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<IdentityRecord, StoreError> {
        self.inner
            .lock()
            .by_username
            .get(username)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<IdentityRecord, StoreError> {
        let mut inner = self.inner.lock();
        if inner.by_username.contains_key(username) {
            return Err(StoreError::Duplicate);
        }

        inner.next_id += 1;
        let record = IdentityRecord {
            id: inner.next_id,
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        inner
            .by_username
            .insert(record.username.clone(), record.clone());
        Ok(record)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
