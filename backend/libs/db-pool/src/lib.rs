//! PostgreSQL pool shared by the chat backend
//!
//! Callers resolve the connection URL themselves. This crate owns pool sizing,
//! timeouts and the round trip that checks a fresh pool.

pub mod env_utils;

use env_utils::parse_env_with_default;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{error, info};

/// Pool sizing and timeouts; every field can be overridden by a `DB_*` variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub min_connections: u32,
    /// Wait for a free connection before giving up
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    /// Upper bound for the `SELECT 1` issued right after connecting
    pub verify_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 20,
            min_connections: 5,
            acquire_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
            verify_timeout: Duration::from_secs(5),
        }
    }
}

impl PoolSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_connections: parse_env_with_default("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: parse_env_with_default("DB_MIN_CONNECTIONS", defaults.min_connections),
            acquire_timeout: secs_from_env("DB_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout),
            idle_timeout: secs_from_env("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout),
            max_lifetime: secs_from_env("DB_MAX_LIFETIME_SECS", defaults.max_lifetime),
            verify_timeout: secs_from_env("DB_VERIFY_TIMEOUT_SECS", defaults.verify_timeout),
        }
    }

    /// Idle floor actually requested from sqlx; never above the ceiling
    pub fn effective_min_connections(&self) -> u32 {
        self.min_connections.min(self.max_connections)
    }

    fn options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.effective_min_connections())
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .test_before_acquire(true)
    }
}

fn secs_from_env(key: &str, default: Duration) -> Duration {
    Duration::from_secs(parse_env_with_default(key, default.as_secs()))
}

/// Opens a pool on `database_url` and checks it with one round trip
pub async fn connect(
    service: &str,
    database_url: &str,
    settings: &PoolSettings,
) -> Result<PgPool, sqlx::Error> {
    info!(service, ?settings, "connecting database pool");

    let pool = settings.options().connect(database_url).await?;
    if let Err(e) = verify(&pool, settings.verify_timeout).await {
        error!(service, error = %e, "database pool failed its first round trip");
        pool.close().await;
        return Err(e);
    }

    info!(service, "database pool ready");
    Ok(pool)
}

async fn verify(pool: &PgPool, timeout: Duration) -> Result<(), sqlx::Error> {
    match tokio::time::timeout(timeout, sqlx::query("SELECT 1").execute(pool)).await {
        Ok(result) => result.map(|_| ()),
        Err(_) => Err(sqlx::Error::PoolTimedOut),
    }
}
