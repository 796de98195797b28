//! Database module providing SQLite connection pooling and the SQL ledger
//! backend.
//!
//! This module manages the database connection pool using sqlx, applies the
//! ledger schema, and implements [`LedgerRepository`](crate::ledger::LedgerRepository)
//! on top of it.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

pub mod config;
pub mod repository;
pub mod schema;

pub use config::DatabaseConfig;
pub use repository::SqlLedger;

/// Database connection pool wrapper
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection pool
    ///
    /// The database file is created if missing. In-memory URLs get a single
    /// connection that is never recycled, since every SQLite connection to
    /// `:memory:` opens its own empty database.
    ///
    /// # Arguments
    ///
    /// * `config` - Database configuration
    ///
    /// # Returns
    ///
    /// * `Result<Database, sqlx::Error>` - Database instance or error
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use token_ledger::db::{Database, DatabaseConfig};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), sqlx::Error> {
    ///     let config = DatabaseConfig::from_env();
    ///     let db = Database::new(&config).await?;
    ///     db.migrate().await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let timeout = Duration::from_secs(config.connection_timeout_secs);
        let mut options = SqliteConnectOptions::from_str(&config.database_url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(timeout);

        let pool_options = SqlitePoolOptions::new().acquire_timeout(timeout);
        let pool_options = if config.is_in_memory() {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
            pool_options
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
                .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        };

        let pool = pool_options.connect_with(options).await?;
        Ok(Self { pool })
    }

    /// Apply the ledger schema; safe to call on every startup
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(schema::SCHEMA).execute(&self.pool).await?;

        for (table, column, definition) in schema::ADDED_COLUMNS {
            let present: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM pragma_table_info(?1) WHERE name = ?2",
            )
            .bind(*table)
            .bind(*column)
            .fetch_one(&self.pool)
            .await?;

            if present == 0 {
                log::info!("Adding column {}.{}", table, column);
                sqlx::raw_sql(&format!(
                    "ALTER TABLE {table} ADD COLUMN {column} {definition}"
                ))
                .execute(&self.pool)
                .await?;
            }
        }

        log::debug!("Ledger schema applied");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check if the database connection is healthy
    ///
    /// # Returns
    ///
    /// * `Result<(), sqlx::Error>` - Ok if healthy, error otherwise
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close the database connection pool
    pub async fn close(self) {
        self.pool.close().await;
    }
}
