//! Command-line configuration management.
//!
//! Wraps the library's [`LedgerConfig`] with the options that only matter to
//! the command-line caller.

use token_ledger::{ConfigError, LedgerConfig};

/// Complete CLI configuration loaded from flags and environment variables
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Backend selection and tuning
    pub ledger: LedgerConfig,
    /// Pretty-print JSON output
    pub pretty: bool,
}

impl CliConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `backend_override` - Optional backend name (from `--backend`)
    /// * `database_url_override` - Optional database URL (from `--db-url`)
    /// * `pretty_flag` - Whether `--pretty` was given
    ///
    /// # Errors
    ///
    /// Returns error if a variable holds an invalid value
    pub fn from_env(
        backend_override: Option<String>,
        database_url_override: Option<String>,
        pretty_flag: bool,
    ) -> Result<Self, ConfigError> {
        let ledger = LedgerConfig::from_env(backend_override, database_url_override)?;

        let pretty = pretty_flag
            || std::env::var("LEDGER_PRETTY")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false);

        Ok(Self { ledger, pretty })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ledger.validate()
    }

    /// Render a JSON value according to the output settings
    pub fn render(&self, value: &serde_json::Value) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        } else {
            value.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use token_ledger::StorageBackend;

    #[test]
    fn test_memory_backend_from_flag() {
        let config = CliConfig::from_env(Some("memory".to_string()), None, true).unwrap();
        assert_eq!(config.ledger.backend, StorageBackend::Memory);
        assert!(config.pretty);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = CliConfig::from_env(Some("redis".to_string()), None, false).unwrap_err();
        assert!(err.to_string().contains("LEDGER_BACKEND"));
    }

    #[test]
    fn test_validation_zero_timeout() {
        let config = CliConfig {
            ledger: LedgerConfig {
                operation_timeout: Duration::ZERO, // Invalid
                ..LedgerConfig::memory()
            },
            pretty: false,
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_render_compact_and_pretty() {
        let value = serde_json::json!({ "token": "RACKDOG", "amount": 60 });
        let mut config = CliConfig {
            ledger: LedgerConfig::memory(),
            pretty: false,
        };
        assert!(!config.render(&value).contains('\n'));

        config.pretty = true;
        assert!(config.render(&value).contains('\n'));
    }
}
