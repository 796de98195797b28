//! Ledger error types.

use std::time::Duration;
use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Malformed input (empty id, empty token, non-positive amount)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Integration not found
    #[error("Integration not found: {0}")]
    IntegrationNotFound(String),

    /// Player not found within an integration
    #[error("Player {player_id} not found in integration {integration_id}")]
    PlayerNotFound {
        integration_id: String,
        player_id: String,
    },

    /// Spend exceeds the current balance
    #[error("Insufficient funds for {token}: available {available}, required {required}")]
    InsufficientFunds {
        token: String,
        available: i64,
        required: i64,
    },

    /// Credit would overflow the balance
    #[error("Balance overflow for {token}")]
    BalanceOverflow { token: String },

    /// Operation did not complete in time
    #[error("Ledger operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Coarse classification used by callers to map errors onto their transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Client bug, never retried
    Validation,
    /// Unknown integration or player
    NotFound,
    /// Business-rule rejection of a spend
    InsufficientFunds,
    /// Storage or scheduling failure outside the ledger's rules
    Infrastructure,
}

impl LedgerError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::Validation(_) | LedgerError::BalanceOverflow { .. } => {
                ErrorKind::Validation
            }
            LedgerError::IntegrationNotFound(_) | LedgerError::PlayerNotFound { .. } => {
                ErrorKind::NotFound
            }
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::Database(_) | LedgerError::Timeout(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns true for unknown integrations and players
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Get a client-safe error message that doesn't leak storage internals
    pub fn client_message(&self) -> String {
        match self {
            // Don't expose SQL details
            LedgerError::Database(_) => "Internal server error".to_string(),
            LedgerError::Timeout(_) => "Ledger temporarily unavailable".to_string(),
            _ => self.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    pub(crate) fn player_not_found(integration_id: &str, player_id: &str) -> Self {
        LedgerError::PlayerNotFound {
            integration_id: integration_id.to_string(),
            player_id: player_id.to_string(),
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
