//! SQLite Identity Store
//! Mission: Pooled, deadline-bounded persistence of identity records

use super::{StoreError, UserRepository};
use crate::auth::models::IdentityRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, Row};
use std::time::Duration;
use tracing::{debug, info};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

/// Pool sizing and per-call deadline.
#[derive(Debug, Clone, Copy)]
pub struct PoolOptions {
    pub max_connections: u32,
    pub min_idle: u32,
    /// Upper bound on a single store call, including pool acquisition.
    pub timeout: Duration,
}

impl Default for PoolOptions {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_idle: 5,
            timeout: Duration::from_secs(3),
        }
    }
}

/// Identity store backed by a bounded r2d2 pool of SQLite connections.
pub struct SqliteUserRepository {
    pool: Pool<SqliteConnectionManager>,
    timeout: Duration,
}

impl SqliteUserRepository {
    /// Open (or create) the database behind `database_url` and ensure the
    /// schema exists.
    ///
    /// Accepts a plain path, `sqlite://<path>` or `sqlite::memory:`.
    pub fn connect(database_url: &str, options: PoolOptions) -> Result<Self> {
        let busy_ms = options.timeout.as_millis() as u64;
        let target = parse_database_url(database_url);
        let manager = match target {
            DatabaseTarget::Memory => SqliteConnectionManager::memory(),
            DatabaseTarget::File(path) => SqliteConnectionManager::file(path),
        }
        .with_init(move |conn| {
            conn.busy_timeout(Duration::from_millis(busy_ms))?;
            conn.execute_batch("PRAGMA journal_mode = WAL;")
        });

        let mut builder = Pool::builder().connection_timeout(options.timeout);
        builder = match target {
            // An in-memory database lives and dies with its single connection.
            DatabaseTarget::Memory => builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None),
            DatabaseTarget::File(_) => builder
                .max_size(options.max_connections)
                .min_idle(Some(options.min_idle)),
        };
        let pool = builder
            .build(manager)
            .context("Failed to build SQLite connection pool")?;

        {
            let conn = pool.get().context("Failed to acquire SQLite connection")?;
            conn.execute(SCHEMA, [])
                .context("Failed to create users table")?;
        }

        info!(
            max_connections = pool.max_size(),
            timeout_ms = options.timeout.as_millis() as u64,
            "Identity store ready"
        );

        Ok(Self {
            pool,
            timeout: options.timeout,
        })
    }

    /// Run `f` on a pooled connection off the async workers, bounded by the
    /// per-call deadline. The connection returns to the pool when `f` ends.
    async fn with_conn<T, F>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        let task = tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&*conn)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => {
                debug!(op, "Store call timed out");
                Err(StoreError::Timeout(self.timeout))
            }
        }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<IdentityRecord, StoreError> {
        let username = username.to_string();
        self.with_conn("find_by_username", move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT id, username, password_hash, created_at
                 FROM users WHERE username = ?1",
            )?;
            let raw = stmt.query_row(params![username], RawRecord::from_row)?;
            raw.into_record()
        })
        .await
    }

    async fn insert(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<IdentityRecord, StoreError> {
        let username = username.to_string();
        let password_hash = password_hash.to_string();
        self.with_conn("insert", move |conn| {
            let created_at = Utc::now();
            let mut stmt = conn.prepare_cached(
                "INSERT INTO users (username, password_hash, created_at)
                 VALUES (?1, ?2, ?3)
                 RETURNING id, username, password_hash, created_at",
            )?;
            let raw = stmt.query_row(
                params![username, password_hash, created_at.to_rfc3339()],
                RawRecord::from_row,
            )?;
            raw.into_record()
        })
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.with_conn("ping", |conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

struct RawRecord {
    id: i64,
    username: String,
    password_hash: String,
    created_at: String,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn into_record(self) -> Result<IdentityRecord, StoreError> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| StoreError::Corrupt(format!("created_at for id {}: {}", self.id, e)))?
            .with_timezone(&Utc);
        Ok(IdentityRecord {
            id: self.id,
            username: self.username,
            password_hash: self.password_hash,
            created_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DatabaseTarget<'a> {
    Memory,
    File(&'a str),
}

fn parse_database_url(url: &str) -> DatabaseTarget<'_> {
    let url = url.trim();
    if url == ":memory:" || url == "sqlite::memory:" {
        return DatabaseTarget::Memory;
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    DatabaseTarget::File(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn create_test_repo() -> (SqliteUserRepository, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let repo = SqliteUserRepository::connect(db_path, PoolOptions::default()).unwrap();
        (repo, temp_file)
    }

    #[test]
    fn test_parse_database_url() {
        assert_eq!(parse_database_url("sqlite::memory:"), DatabaseTarget::Memory);
        assert_eq!(parse_database_url(":memory:"), DatabaseTarget::Memory);
        assert_eq!(
            parse_database_url("sqlite://data/auth.db"),
            DatabaseTarget::File("data/auth.db")
        );
        assert_eq!(
            parse_database_url("sqlite:auth.db"),
            DatabaseTarget::File("auth.db")
        );
        assert_eq!(
            parse_database_url("/var/lib/auth.db"),
            DatabaseTarget::File("/var/lib/auth.db")
        );
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_ids() {
        let (repo, _temp) = create_test_repo();

        let alice = repo.insert("alice", "hash-a").await.unwrap();
        let bob = repo.insert("bob", "hash-b").await.unwrap();

        assert_eq!(alice.id, 1);
        assert_eq!(bob.id, 2);
        assert_eq!(alice.username, "alice");
    }

    #[tokio::test]
    async fn test_find_by_username_round_trip() {
        let (repo, _temp) = create_test_repo();
        let created = repo.insert("alice", "hash-a").await.unwrap();

        let found = repo.find_by_username("alice").await.unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "hash-a");
        assert_eq!(found.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_lookup_is_case_sensitive() {
        let (repo, _temp) = create_test_repo();
        repo.insert("alice", "hash-a").await.unwrap();

        let result = repo.find_by_username("Alice").await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_unique_constraint_rejects_duplicate() {
        let (repo, _temp) = create_test_repo();
        repo.insert("alice", "hash-a").await.unwrap();

        let result = repo.insert("alice", "hash-b").await;
        assert!(matches!(result, Err(StoreError::Duplicate)));
    }

    #[tokio::test]
    async fn test_not_null_violation_is_not_duplicate() {
        let (repo, _temp) = create_test_repo();
        let result = repo
            .with_conn("insert_null_hash", |conn| {
                conn.execute(
                    "INSERT INTO users (username, password_hash, created_at)
                     VALUES ('alice', NULL, '2024-01-01T00:00:00+00:00')",
                    [],
                )?;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Sqlite(_))));

        // The failed row left the username free.
        assert!(repo.insert("alice", "hash-a").await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_inserts_admit_exactly_one() {
        let (repo, _temp) = create_test_repo();
        let repo = Arc::new(repo);

        let mut handles = Vec::new();
        for i in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.insert("racer", &format!("hash-{i}")).await
            }));
        }

        let mut ok = 0;
        let mut dup = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(StoreError::Duplicate) => dup += 1,
                Err(e) => panic!("unexpected store error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(dup, 7);
    }

    #[tokio::test]
    async fn test_schema_survives_reopen() {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap().to_string();

        {
            let repo = SqliteUserRepository::connect(&db_path, PoolOptions::default()).unwrap();
            repo.insert("alice", "hash-a").await.unwrap();
        }

        let reopened = SqliteUserRepository::connect(&db_path, PoolOptions::default()).unwrap();
        assert!(reopened.find_by_username("alice").await.is_ok());
    }

    #[tokio::test]
    async fn test_in_memory_database_url() {
        let repo = SqliteUserRepository::connect("sqlite::memory:", PoolOptions::default()).unwrap();
        repo.insert("alice", "hash-a").await.unwrap();
        assert!(repo.find_by_username("alice").await.is_ok());
        assert!(repo.ping().await.is_ok());
    }
}
