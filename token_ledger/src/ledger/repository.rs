//! Storage capability shared by every ledger backend.
//!
//! [`LedgerStore`](super::LedgerStore) only talks to a `dyn LedgerRepository`,
//! so the in-memory and SQL backends are interchangeable at the composition
//! root.

use async_trait::async_trait;

use super::errors::LedgerResult;
use super::models::{Integration, LedgerEntry, Metadata, Player};

/// A single validated earn or spend against one balance key
#[derive(Debug, Clone, Copy)]
pub struct Posting<'a> {
    pub integration_id: &'a str,
    pub player_id: &'a str,
    pub token: &'a str,
    /// Always positive; the operation decides the sign
    pub amount: i64,
    pub memo: &'a str,
    pub metadata: &'a Metadata,
}

/// Trait for ledger storage backends
///
/// Implementations must make `credit` and `debit` atomic per
/// `(integration, player, token)`: the balance check, the balance write,
/// the journal entry and the returned snapshot all belong to one step.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Insert or update an integration by id
    async fn upsert_integration(
        &self,
        id: &str,
        name: &str,
        company_id: &str,
    ) -> LedgerResult<Integration>;

    /// Find integration by id
    async fn find_integration(&self, id: &str) -> LedgerResult<Option<Integration>>;

    /// Create a player or merge an alias into an existing one
    ///
    /// Fails with `IntegrationNotFound` when the integration is unknown.
    async fn upsert_player(
        &self,
        integration_id: &str,
        player_id: &str,
        alias: Option<&str>,
    ) -> LedgerResult<Player>;

    /// Find player with all balances
    async fn find_player(
        &self,
        integration_id: &str,
        player_id: &str,
    ) -> LedgerResult<Option<Player>>;

    /// Atomically add to a balance, returning the player snapshot after the write
    async fn credit(&self, posting: &Posting<'_>) -> LedgerResult<Player>;

    /// Atomically subtract from a balance if it covers the amount
    async fn debit(&self, posting: &Posting<'_>) -> LedgerResult<Player>;

    /// Journal entries for a player, newest first
    async fn entries(
        &self,
        integration_id: &str,
        player_id: &str,
        limit: usize,
    ) -> LedgerResult<Vec<LedgerEntry>>;
}
