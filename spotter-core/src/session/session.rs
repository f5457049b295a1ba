use crate::config::Config;
use crate::db;
use anyhow::{Context, Result};
use log::info;
use sqlx::sqlite::Sqlite;
use sqlx::{SqlitePool, Transaction};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

/// Entry point for session and progress operations.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone, Debug)]
pub struct Session {
    pub db_pool: SqlitePool,
    config: Config,
}

impl Session {
    /// Opens (creating if needed) the database named by `config` and applies
    /// pending migrations.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let options = SqliteConnectOptions::from_str(&config.database_url)
            .with_context(|| format!("Invalid database url {}", config.database_url))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(config.busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create DB pool: {}", e))?;

        db::init_database(&pool).await?;
        info!(
            "Session ready on {} ({} connections)",
            config.database_url, config.max_connections
        );

        Ok(Self::with_pool(pool, config))
    }

    /// Wraps an already migrated pool.
    pub fn with_pool(db_pool: SqlitePool, config: Config) -> Self {
        Self { db_pool, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Opens a transaction that takes the write lock up front.
    ///
    /// Concurrent writers wait for it under `busy_timeout` and then read what
    /// the previous writer committed.
    pub(crate) async fn begin_write(&self) -> sqlx::Result<Transaction<'static, Sqlite>> {
        self.db_pool.begin_with("BEGIN IMMEDIATE").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_applies_migrations_on_in_memory_database() {
        let session = Session::new(Config::in_memory()).await.unwrap();
        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'workout_sets'",
        )
        .fetch_one(&session.db_pool)
        .await
        .unwrap();
        assert_eq!(tables, 1);
        assert_eq!(session.config().recent_set_limit, 10);
    }

    #[tokio::test]
    async fn new_rejects_invalid_config() {
        let config = Config {
            max_connections: 0,
            ..Config::in_memory()
        };
        assert!(Session::new(config).await.is_err());
    }
}
