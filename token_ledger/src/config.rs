//! Ledger configuration management.
//!
//! Consolidates the environment variables that select and tune the storage
//! backend.

use std::time::Duration;

use crate::db::{DatabaseConfig, config::parse_env_or};
use crate::ledger::timeouts::DEFAULT_OPERATION_TIMEOUT;

/// Storage backend selected by the composition root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local maps, lost on exit
    Memory,
    /// SQLite database through sqlx
    Sqlite(DatabaseConfig),
}

/// Complete ledger configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Storage backend
    pub backend: StorageBackend,
    /// Upper bound for a single store operation
    pub operation_timeout: Duration,
}

impl LedgerConfig {
    /// Load configuration from environment variables
    ///
    /// - `LEDGER_BACKEND`: `memory` or `sqlite` (default: `sqlite`)
    /// - `LEDGER_OPERATION_TIMEOUT_MS`: per-operation timeout (default: 5000)
    /// - `DATABASE_URL`, `DB_*`: see [`DatabaseConfig::from_env`]
    ///
    /// # Arguments
    ///
    /// * `backend_override` - Optional backend name (from CLI args)
    /// * `database_url_override` - Optional database URL (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` for an unknown backend name
    pub fn from_env(
        backend_override: Option<String>,
        database_url_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let backend_name = backend_override
            .or_else(|| std::env::var("LEDGER_BACKEND").ok())
            .unwrap_or_else(|| "sqlite".to_string());

        let backend = match backend_name.to_lowercase().as_str() {
            "memory" => StorageBackend::Memory,
            "sqlite" => {
                let mut database = DatabaseConfig::from_env();
                if let Some(url) = database_url_override {
                    database.database_url = url;
                }
                StorageBackend::Sqlite(database)
            }
            other => {
                return Err(ConfigError::Invalid {
                    var: "LEDGER_BACKEND".to_string(),
                    reason: format!("Unknown backend '{other}', expected 'memory' or 'sqlite'"),
                });
            }
        };

        let operation_timeout = Duration::from_millis(parse_env_or(
            "LEDGER_OPERATION_TIMEOUT_MS",
            DEFAULT_OPERATION_TIMEOUT.as_millis() as u64,
        ));

        Ok(Self {
            backend,
            operation_timeout,
        })
    }

    /// In-memory configuration with default timeout
    pub fn memory() -> Self {
        Self {
            backend: StorageBackend::Memory,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operation_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                var: "LEDGER_OPERATION_TIMEOUT_MS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if let StorageBackend::Sqlite(database) = &self.backend {
            if database.database_url.is_empty() {
                return Err(ConfigError::Invalid {
                    var: "DATABASE_URL".to_string(),
                    reason: "Must not be empty".to_string(),
                });
            }

            if database.max_connections == 0 {
                return Err(ConfigError::Invalid {
                    var: "DB_MAX_CONNECTIONS".to_string(),
                    reason: "Must be greater than 0".to_string(),
                });
            }

            if database.min_connections > database.max_connections {
                return Err(ConfigError::Invalid {
                    var: "DB_MIN_CONNECTIONS".to_string(),
                    reason: format!(
                        "Cannot exceed max connections ({})",
                        database.max_connections
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
