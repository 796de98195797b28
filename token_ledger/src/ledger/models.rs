//! Ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token symbol, e.g. `RACKDOG`. Opaque and case-sensitive.
pub type Token = String;

/// Free-form key/value context attached to a posting (game mode, map, ...)
pub type Metadata = BTreeMap<String, String>;

/// Registered game/studio economy namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub id: String,
    pub name: String,
    pub company_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Player identity scoped to one integration, with every token balance it
/// has ever transacted (zero balances included).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub integration_id: String,
    /// Most recently registered alias
    pub alias: Option<String>,
    /// Every distinct alias, in first-registration order
    pub aliases: Vec<String>,
    pub balances: BTreeMap<Token, i64>,
    pub created_at: DateTime<Utc>,
}

impl Player {
    /// Balance for a token, 0 when never transacted
    pub fn balance(&self, token: &str) -> i64 {
        self.balances.get(token).copied().unwrap_or(0)
    }

    /// Merge an alias into the alias set. Returns true if it was new.
    pub(crate) fn merge_alias(&mut self, alias: &str) -> bool {
        self.alias = Some(alias.to_string());
        if self.aliases.iter().any(|a| a == alias) {
            return false;
        }
        self.aliases.push(alias.to_string());
        true
    }
}

/// Journal entry written for every successful earn or spend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub integration_id: String,
    pub player_id: String,
    pub token: Token,
    /// Signed amount: positive for credits, negative for debits
    pub amount: i64,
    pub balance_after: i64,
    pub direction: EntryDirection,
    /// Earn source or spend reason, free text
    pub memo: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

/// Entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    Credit,
    Debit,
}

impl EntryDirection {
    /// Apply the direction's sign to a positive amount
    pub fn signed(self, amount: i64) -> i64 {
        match self {
            EntryDirection::Credit => amount,
            EntryDirection::Debit => -amount,
        }
    }
}

impl std::fmt::Display for EntryDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryDirection::Credit => write!(f, "credit"),
            EntryDirection::Debit => write!(f, "debit"),
        }
    }
}

impl std::str::FromStr for EntryDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(EntryDirection::Credit),
            "debit" => Ok(EntryDirection::Debit),
            other => Err(format!("unknown entry direction '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player {
            id: "p1".to_string(),
            integration_id: "g1".to_string(),
            alias: None,
            aliases: Vec::new(),
            balances: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_alias_is_set_like() {
        let mut p = player();
        assert!(p.merge_alias("Neo"));
        assert!(p.merge_alias("Trinity"));
        assert!(!p.merge_alias("Neo"));

        assert_eq!(p.aliases, vec!["Neo".to_string(), "Trinity".to_string()]);
        assert_eq!(p.alias.as_deref(), Some("Neo"));
    }

    #[test]
    fn test_balance_defaults_to_zero() {
        let mut p = player();
        p.balances.insert("RACKDOG".to_string(), 60);
        assert_eq!(p.balance("RACKDOG"), 60);
        assert_eq!(p.balance("rackdog"), 0);
    }

    #[test]
    fn test_entry_direction_round_trip() {
        assert_eq!("credit".parse::<EntryDirection>(), Ok(EntryDirection::Credit));
        assert_eq!(EntryDirection::Debit.to_string(), "debit");
        assert_eq!(EntryDirection::Debit.signed(40), -40);
        assert!("refund".parse::<EntryDirection>().is_err());
    }

    #[test]
    fn test_player_serializes_balances_in_token_order() {
        let mut p = player();
        p.balances.insert("XP".to_string(), 1);
        p.balances.insert("GEMS".to_string(), 2);
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.find("GEMS").unwrap() < json.find("XP").unwrap());
    }
}
