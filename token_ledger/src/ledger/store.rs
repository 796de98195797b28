//! Store façade composing the integration registry, player registry and
//! balance ledger behind one interface.

use std::sync::Arc;
use std::time::Duration;

use super::{
    errors::{LedgerError, LedgerResult},
    memory::MemoryLedger,
    models::{Integration, LedgerEntry, Metadata, Player},
    repository::{LedgerRepository, Posting},
    requests::{
        EarnRequest, SpendRequest, normalize_alias, require_non_empty, validate_posting,
    },
    timeouts::{DEFAULT_OPERATION_TIMEOUT, with_timeout},
};
use crate::config::{LedgerConfig, StorageBackend};
use crate::db::{Database, SqlLedger};

/// Ledger store
///
/// Cheap to clone; clones share the same backend.
#[derive(Clone)]
pub struct LedgerStore {
    repository: Arc<dyn LedgerRepository>,
    operation_timeout: Duration,
}

impl LedgerStore {
    /// Create a store over any backend
    ///
    /// # Arguments
    ///
    /// * `repository` - Storage backend
    pub fn new(repository: Arc<dyn LedgerRepository>) -> Self {
        Self {
            repository,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Create a store backed by a fresh in-memory ledger
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryLedger::new()))
    }

    /// Override the per-operation timeout
    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    /// Build the store selected by configuration
    ///
    /// For the SQLite backend this connects the pool and runs the schema
    /// migration before returning.
    ///
    /// # Errors
    ///
    /// * `LedgerError::Database` - Connection or migration failed
    pub async fn from_config(config: &LedgerConfig) -> LedgerResult<Self> {
        let store = match &config.backend {
            StorageBackend::Memory => {
                log::info!("Using in-memory ledger backend");
                Self::in_memory()
            }
            StorageBackend::Sqlite(database) => {
                log::info!("Using SQLite ledger backend at {}", database.database_url);
                let db = Database::new(database).await?;
                db.migrate().await?;
                Self::new(Arc::new(SqlLedger::new(db.pool().clone())))
            }
        };

        Ok(store.with_operation_timeout(config.operation_timeout))
    }

    /// Register or update an integration
    ///
    /// # Errors
    ///
    /// * `LedgerError::Validation` - Empty id or name
    pub async fn register_integration(
        &self,
        id: &str,
        name: &str,
        company_id: &str,
    ) -> LedgerResult<Integration> {
        require_non_empty("integration id", id)?;
        require_non_empty("integration name", name)?;

        let integration = with_timeout(
            self.operation_timeout,
            self.repository.upsert_integration(id, name, company_id),
        )
        .await?;

        log::info!("Registered integration {} ({})", integration.id, integration.name);
        Ok(integration)
    }

    /// Get integration by id
    ///
    /// # Errors
    ///
    /// * `LedgerError::IntegrationNotFound` - Unknown integration
    pub async fn get_integration(&self, id: &str) -> LedgerResult<Integration> {
        with_timeout(self.operation_timeout, self.load_integration(id)).await
    }

    /// Register a player or merge a new alias into an existing one
    ///
    /// Balances of an existing player are left untouched. Empty aliases are
    /// ignored.
    ///
    /// # Errors
    ///
    /// * `LedgerError::Validation` - Empty integration or player id
    /// * `LedgerError::IntegrationNotFound` - Unknown integration
    pub async fn register_player(
        &self,
        integration_id: &str,
        player_id: &str,
        alias: Option<&str>,
    ) -> LedgerResult<Player> {
        require_non_empty("integration id", integration_id)?;
        require_non_empty("player id", player_id)?;
        let alias = normalize_alias(alias);

        let player = with_timeout(self.operation_timeout, async {
            self.load_integration(integration_id).await?;
            self.repository
                .upsert_player(integration_id, player_id, alias)
                .await
        })
        .await?;

        log::info!(
            "Registered player {} in integration {}",
            player.id,
            player.integration_id
        );
        Ok(player)
    }

    /// Get player with all balances
    ///
    /// # Errors
    ///
    /// * `LedgerError::IntegrationNotFound` - Unknown integration
    /// * `LedgerError::PlayerNotFound` - Unknown player
    pub async fn get_player(&self, integration_id: &str, player_id: &str) -> LedgerResult<Player> {
        with_timeout(
            self.operation_timeout,
            self.load_player(integration_id, player_id),
        )
        .await
    }

    /// Credit tokens to a player
    ///
    /// # Arguments
    ///
    /// * `integration_id` - Integration the player belongs to
    /// * `player_id` - Player ID
    /// * `token` - Token symbol
    /// * `amount` - Amount to credit, must be positive
    /// * `source` - Free-text origin recorded in the journal
    ///
    /// # Returns
    ///
    /// * `LedgerResult<Player>` - Player snapshot taken atomically with the credit
    ///
    /// # Errors
    ///
    /// * `LedgerError::Validation` - Empty token or non-positive amount
    /// * `LedgerError::IntegrationNotFound` / `LedgerError::PlayerNotFound`
    /// * `LedgerError::BalanceOverflow` - Balance would exceed `i64::MAX`
    pub async fn earn(
        &self,
        integration_id: &str,
        player_id: &str,
        token: &str,
        amount: i64,
        source: &str,
    ) -> LedgerResult<Player> {
        let metadata = Metadata::new();
        self.credit(Posting {
            integration_id,
            player_id,
            token,
            amount,
            memo: source,
            metadata: &metadata,
        })
        .await
    }

    /// Credit tokens from a decoded [`EarnRequest`], journaling its metadata
    pub async fn apply_earn(
        &self,
        integration_id: &str,
        player_id: &str,
        request: &EarnRequest,
    ) -> LedgerResult<Player> {
        self.credit(Posting {
            integration_id,
            player_id,
            token: &request.token,
            amount: request.amount,
            memo: &request.source,
            metadata: &request.metadata,
        })
        .await
    }

    /// Debit tokens from a player
    ///
    /// The balance check and the write happen in one atomic step; a rejected
    /// spend leaves every balance unchanged.
    ///
    /// # Errors
    ///
    /// * `LedgerError::Validation` - Empty token or non-positive amount
    /// * `LedgerError::IntegrationNotFound` / `LedgerError::PlayerNotFound`
    /// * `LedgerError::InsufficientFunds` - Balance lower than `amount`
    pub async fn spend(
        &self,
        integration_id: &str,
        player_id: &str,
        token: &str,
        amount: i64,
        reason: &str,
    ) -> LedgerResult<Player> {
        let metadata = Metadata::new();
        self.debit(Posting {
            integration_id,
            player_id,
            token,
            amount,
            memo: reason,
            metadata: &metadata,
        })
        .await
    }

    /// Debit tokens from a decoded [`SpendRequest`], journaling its metadata
    pub async fn apply_spend(
        &self,
        integration_id: &str,
        player_id: &str,
        request: &SpendRequest,
    ) -> LedgerResult<Player> {
        self.debit(Posting {
            integration_id,
            player_id,
            token: &request.token,
            amount: request.amount,
            memo: &request.reason,
            metadata: &request.metadata,
        })
        .await
    }

    async fn credit(&self, posting: Posting<'_>) -> LedgerResult<Player> {
        validate_posting(posting.token, posting.amount)?;

        let player = with_timeout(self.operation_timeout, async {
            self.load_integration(posting.integration_id).await?;
            self.repository.credit(&posting).await
        })
        .await?;

        log::debug!(
            "Credited {} {} to {}/{} ({}), balance {}",
            posting.amount,
            posting.token,
            posting.integration_id,
            posting.player_id,
            posting.memo,
            player.balance(posting.token)
        );
        Ok(player)
    }

    async fn debit(&self, posting: Posting<'_>) -> LedgerResult<Player> {
        validate_posting(posting.token, posting.amount)?;

        let result = with_timeout(self.operation_timeout, async {
            self.load_integration(posting.integration_id).await?;
            self.repository.debit(&posting).await
        })
        .await;

        match &result {
            Ok(player) => log::debug!(
                "Debited {} {} from {}/{} ({}), balance {}",
                posting.amount,
                posting.token,
                posting.integration_id,
                posting.player_id,
                posting.memo,
                player.balance(posting.token)
            ),
            Err(LedgerError::InsufficientFunds { available, .. }) => log::warn!(
                "Rejected spend of {} {} by {}/{}: only {} available",
                posting.amount,
                posting.token,
                posting.integration_id,
                posting.player_id,
                available
            ),
            Err(_) => {}
        }
        result
    }

    /// Current balance of one token, 0 if never transacted
    ///
    /// # Errors
    ///
    /// * `LedgerError::IntegrationNotFound` / `LedgerError::PlayerNotFound`
    pub async fn get_balance(
        &self,
        integration_id: &str,
        player_id: &str,
        token: &str,
    ) -> LedgerResult<i64> {
        let player = self.get_player(integration_id, player_id).await?;
        Ok(player.balance(token))
    }

    /// Journal entries for a player, newest first
    ///
    /// # Errors
    ///
    /// * `LedgerError::Validation` - `limit` is zero
    /// * `LedgerError::IntegrationNotFound` / `LedgerError::PlayerNotFound`
    pub async fn history(
        &self,
        integration_id: &str,
        player_id: &str,
        limit: usize,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        if limit == 0 {
            return Err(LedgerError::validation("limit must be positive"));
        }

        with_timeout(self.operation_timeout, async {
            self.load_player(integration_id, player_id).await?;
            self.repository
                .entries(integration_id, player_id, limit)
                .await
        })
        .await
    }

    async fn load_integration(&self, id: &str) -> LedgerResult<Integration> {
        self.repository
            .find_integration(id)
            .await?
            .ok_or_else(|| LedgerError::IntegrationNotFound(id.to_string()))
    }

    async fn load_player(&self, integration_id: &str, player_id: &str) -> LedgerResult<Player> {
        self.load_integration(integration_id).await?;
        self.repository
            .find_player(integration_id, player_id)
            .await?
            .ok_or_else(|| LedgerError::player_not_found(integration_id, player_id))
    }
}
