//! In-memory ledger backend.
//!
//! Each player account sits behind its own async mutex, so postings for
//! different players never contend. Once a posting holds the account lock it
//! runs to completion without awaiting, which makes every mutation
//! all-or-nothing even if the caller's future is dropped.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::{Mutex, RwLock};

use super::errors::{LedgerError, LedgerResult};
use super::models::{EntryDirection, Integration, LedgerEntry, Player};
use super::repository::{LedgerRepository, Posting};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PlayerKey {
    integration_id: String,
    player_id: String,
}

impl PlayerKey {
    fn new(integration_id: &str, player_id: &str) -> Self {
        Self {
            integration_id: integration_id.to_string(),
            player_id: player_id.to_string(),
        }
    }
}

#[derive(Debug)]
struct Account {
    player: Player,
    entries: Vec<LedgerEntry>,
}

impl Account {
    fn record(
        &mut self,
        id: i64,
        posting: &Posting<'_>,
        direction: EntryDirection,
        balance_after: i64,
    ) {
        self.player
            .balances
            .insert(posting.token.to_string(), balance_after);
        self.entries.push(LedgerEntry {
            id,
            integration_id: posting.integration_id.to_string(),
            player_id: posting.player_id.to_string(),
            token: posting.token.to_string(),
            amount: direction.signed(posting.amount),
            balance_after,
            direction,
            memo: posting.memo.to_string(),
            metadata: posting.metadata.clone(),
            created_at: Utc::now(),
        });
    }
}

/// Ledger held entirely in process memory
#[derive(Default)]
pub struct MemoryLedger {
    integrations: RwLock<HashMap<String, Integration>>,
    accounts: RwLock<HashMap<PlayerKey, Arc<Mutex<Account>>>>,
    next_entry_id: AtomicI64,
}

impl MemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    fn next_entry_id(&self) -> i64 {
        self.next_entry_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn account(
        &self,
        integration_id: &str,
        player_id: &str,
    ) -> LedgerResult<Arc<Mutex<Account>>> {
        let accounts = self.accounts.read().await;
        accounts
            .get(&PlayerKey::new(integration_id, player_id))
            .cloned()
            .ok_or_else(|| LedgerError::player_not_found(integration_id, player_id))
    }
}

#[async_trait]
impl LedgerRepository for MemoryLedger {
    async fn upsert_integration(
        &self,
        id: &str,
        name: &str,
        company_id: &str,
    ) -> LedgerResult<Integration> {
        let now = Utc::now();
        let mut integrations = self.integrations.write().await;
        let integration = integrations
            .entry(id.to_string())
            .and_modify(|existing| {
                if existing.name != name || existing.company_id != company_id {
                    existing.name = name.to_string();
                    existing.company_id = company_id.to_string();
                    existing.updated_at = now;
                }
            })
            .or_insert_with(|| Integration {
                id: id.to_string(),
                name: name.to_string(),
                company_id: company_id.to_string(),
                created_at: now,
                updated_at: now,
            });

        Ok(integration.clone())
    }

    async fn find_integration(&self, id: &str) -> LedgerResult<Option<Integration>> {
        Ok(self.integrations.read().await.get(id).cloned())
    }

    async fn upsert_player(
        &self,
        integration_id: &str,
        player_id: &str,
        alias: Option<&str>,
    ) -> LedgerResult<Player> {
        // Integrations are never removed, so a passed check stays valid.
        if !self.integrations.read().await.contains_key(integration_id) {
            return Err(LedgerError::IntegrationNotFound(integration_id.to_string()));
        }

        let key = PlayerKey::new(integration_id, player_id);
        let account = {
            let mut accounts = self.accounts.write().await;
            match accounts.get(&key) {
                Some(account) => account.clone(),
                None => {
                    // A new player is created with its alias under the same guard
                    let mut player = Player {
                        id: player_id.to_string(),
                        integration_id: integration_id.to_string(),
                        alias: None,
                        aliases: Vec::new(),
                        balances: BTreeMap::new(),
                        created_at: Utc::now(),
                    };
                    if let Some(alias) = alias {
                        player.merge_alias(alias);
                    }
                    accounts.insert(
                        key,
                        Arc::new(Mutex::new(Account {
                            player: player.clone(),
                            entries: Vec::new(),
                        })),
                    );
                    return Ok(player);
                }
            }
        };

        let mut account = account.lock().await;
        if let Some(alias) = alias {
            account.player.merge_alias(alias);
        }
        Ok(account.player.clone())
    }

    async fn find_player(
        &self,
        integration_id: &str,
        player_id: &str,
    ) -> LedgerResult<Option<Player>> {
        match self.account(integration_id, player_id).await {
            Ok(account) => Ok(Some(account.lock().await.player.clone())),
            Err(LedgerError::PlayerNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn credit(&self, posting: &Posting<'_>) -> LedgerResult<Player> {
        let account = self
            .account(posting.integration_id, posting.player_id)
            .await?;
        let mut account = account.lock().await;

        let new_balance = account
            .player
            .balance(posting.token)
            .checked_add(posting.amount)
            .ok_or_else(|| LedgerError::BalanceOverflow {
                token: posting.token.to_string(),
            })?;

        account.record(
            self.next_entry_id(),
            posting,
            EntryDirection::Credit,
            new_balance,
        );
        Ok(account.player.clone())
    }

    async fn debit(&self, posting: &Posting<'_>) -> LedgerResult<Player> {
        let account = self
            .account(posting.integration_id, posting.player_id)
            .await?;
        let mut account = account.lock().await;

        // Check and write under the same lock guard
        let available = account.player.balance(posting.token);
        if available < posting.amount {
            return Err(LedgerError::InsufficientFunds {
                token: posting.token.to_string(),
                available,
                required: posting.amount,
            });
        }

        account.record(
            self.next_entry_id(),
            posting,
            EntryDirection::Debit,
            available - posting.amount,
        );
        Ok(account.player.clone())
    }

    async fn entries(
        &self,
        integration_id: &str,
        player_id: &str,
        limit: usize,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let account = self.account(integration_id, player_id).await?;
        let account = account.lock().await;
        Ok(account.entries.iter().rev().take(limit).cloned().collect())
    }
}
