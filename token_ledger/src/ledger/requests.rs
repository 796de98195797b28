//! Typed request records and boundary validation.
//!
//! Callers decode their transport payloads into these records and call
//! `validate()` before handing the primitive fields to [`LedgerStore`].
//! The store re-checks the same rules, so skipping `validate()` is safe but
//! yields the same [`LedgerError::Validation`] later.
//!
//! [`LedgerStore`]: super::LedgerStore

use super::errors::{LedgerError, LedgerResult};
use super::models::Metadata;
use serde::{Deserialize, Serialize};

/// Register or update an integration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterIntegrationRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company_id: String,
}

impl RegisterIntegrationRequest {
    pub fn validate(&self) -> LedgerResult<()> {
        require_non_empty("integration id", &self.id)?;
        require_non_empty("integration name", &self.name)
    }
}

/// Register a player, or merge an alias into an existing one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterPlayerRequest {
    pub player_id: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl RegisterPlayerRequest {
    pub fn validate(&self) -> LedgerResult<()> {
        require_non_empty("player id", &self.player_id)
    }
}

/// Credit tokens to a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarnRequest {
    pub token: String,
    pub amount: i64,
    /// e.g. "match_win", "quest", "signup"
    #[serde(default)]
    pub source: String,
    /// Optional extra context, e.g. game mode or map
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl EarnRequest {
    pub fn validate(&self) -> LedgerResult<()> {
        validate_posting(&self.token, self.amount)
    }
}

/// Debit tokens from a player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRequest {
    pub token: String,
    pub amount: i64,
    /// e.g. "skin_purchase", "battle_pass"
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl SpendRequest {
    pub fn validate(&self) -> LedgerResult<()> {
        validate_posting(&self.token, self.amount)
    }
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> LedgerResult<()> {
    if value.trim().is_empty() {
        return Err(LedgerError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub(crate) fn validate_posting(token: &str, amount: i64) -> LedgerResult<()> {
    require_non_empty("token", token)?;
    if amount <= 0 {
        return Err(LedgerError::validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    Ok(())
}

/// Empty and whitespace-only aliases count as absent
pub(crate) fn normalize_alias(alias: Option<&str>) -> Option<&str> {
    alias.map(str::trim).filter(|a| !a.is_empty())
}
