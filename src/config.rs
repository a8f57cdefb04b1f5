//! Service Configuration
//!
//! Resolved once at startup from flags, environment variables and `.env`,
//! then passed down. Nothing below `main` reads the environment.
//!
//! Environment:
//!   DATABASE_URL - SQLite location: path, `sqlite://<path>` or `sqlite::memory:` (required)
//!   JWT_SECRET - HS256 signing secret (logins fail with 500 while unset)
//!   BIND_ADDR / PORT - listen address (default: 0.0.0.0:8080)
//!   DB_MAX_CONNECTIONS / DB_MIN_IDLE - pool bounds (default: 10 / 5)
//!   STORE_TIMEOUT_MS - per store call deadline (default: 3000)

use crate::db::PoolOptions;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Clone)]
#[command(name = "credential-service")]
#[command(about = "User registration and bearer-token login service")]
pub struct Config {
    /// Identity store location
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Symmetric token signing secret
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Address to bind
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Max open connections in the store pool
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value = "10")]
    pub db_max_connections: u32,

    /// Idle connections kept in the store pool
    #[arg(long, env = "DB_MIN_IDLE", default_value = "5")]
    pub db_min_idle: u32,

    /// Per store call deadline in milliseconds
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value = "3000")]
    pub store_timeout_ms: u64,
}

// Keeps the secret out of `{:?}` output.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<set>"))
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_idle", &self.db_min_idle)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .finish()
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.database_url.trim().is_empty() {
            bail!("DATABASE_URL is empty");
        }
        if self.db_max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.db_min_idle > self.db_max_connections {
            bail!(
                "DB_MIN_IDLE ({}) exceeds DB_MAX_CONNECTIONS ({})",
                self.db_min_idle,
                self.db_max_connections
            );
        }
        if self.store_timeout_ms == 0 {
            bail!("STORE_TIMEOUT_MS must be positive");
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_connections: self.db_max_connections,
            min_idle: self.db_min_idle,
            timeout: self.store_timeout(),
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_addr, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.bind_addr, self.port))
    }

    pub fn has_signing_secret(&self) -> bool {
        self.jwt_secret
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }
}
