//! SQL implementation of the ledger repository.
//!
//! Every posting runs in one transaction whose first statement is the
//! conditional write, so the balance check and the update are a single
//! atomic SQL step and the transaction holds the write lock from then on.
//! Dropping the transaction (cancellation, timeout) rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqlitePool, SqliteRow};
use sqlx::Row;
use std::collections::BTreeMap;

use crate::ledger::{
    EntryDirection, Integration, LedgerEntry, LedgerError, LedgerRepository, LedgerResult,
    Metadata, Player, Posting,
};

/// Ledger backed by SQLite through sqlx
#[derive(Clone)]
pub struct SqlLedger {
    pool: SqlitePool,
}

impl SqlLedger {
    /// Create a ledger over a migrated pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a journal entry inside the posting's transaction
    async fn create_entry(
        conn: &mut SqliteConnection,
        posting: &Posting<'_>,
        direction: EntryDirection,
        balance_after: i64,
    ) -> LedgerResult<i64> {
        let metadata = serde_json::to_string(posting.metadata)
            .map_err(|e| LedgerError::Database(sqlx::Error::Encode(e.into())))?;

        let row = sqlx::query(
            r#"
            INSERT INTO ledger_entries
                (integration_id, player_id, token, amount, balance_after, direction, memo, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            RETURNING id
            "#,
        )
        .bind(posting.integration_id)
        .bind(posting.player_id)
        .bind(posting.token)
        .bind(direction.signed(posting.amount))
        .bind(balance_after)
        .bind(direction.to_string())
        .bind(posting.memo)
        .bind(metadata)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(row.get("id"))
    }
}

async fn player_exists(
    conn: &mut SqliteConnection,
    integration_id: &str,
    player_id: &str,
) -> LedgerResult<bool> {
    let row = sqlx::query("SELECT 1 FROM players WHERE integration_id = ?1 AND player_id = ?2")
        .bind(integration_id)
        .bind(player_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

async fn load_player(
    conn: &mut SqliteConnection,
    integration_id: &str,
    player_id: &str,
) -> LedgerResult<Option<Player>> {
    let row = sqlx::query(
        r#"
        SELECT player_id, integration_id, alias, created_at
        FROM players
        WHERE integration_id = ?1 AND player_id = ?2
        "#,
    )
    .bind(integration_id)
    .bind(player_id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let aliases: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT alias FROM player_aliases
        WHERE integration_id = ?1 AND player_id = ?2
        ORDER BY rowid
        "#,
    )
    .bind(integration_id)
    .bind(player_id)
    .fetch_all(&mut *conn)
    .await?;

    let balances = sqlx::query(
        "SELECT token, amount FROM balances WHERE integration_id = ?1 AND player_id = ?2",
    )
    .bind(integration_id)
    .bind(player_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|r| (r.get::<String, _>("token"), r.get::<i64, _>("amount")))
    .collect::<BTreeMap<_, _>>();

    Ok(Some(Player {
        id: row.get("player_id"),
        integration_id: row.get("integration_id"),
        alias: row.get("alias"),
        aliases,
        balances,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    }))
}

fn snapshot_or_missing(
    player: Option<Player>,
    integration_id: &str,
    player_id: &str,
) -> LedgerResult<Player> {
    player.ok_or_else(|| LedgerError::player_not_found(integration_id, player_id))
}

fn entry_from_row(row: &SqliteRow) -> LedgerResult<LedgerEntry> {
    let direction = row
        .get::<String, _>("direction")
        .parse::<EntryDirection>()
        .map_err(|e| LedgerError::Database(sqlx::Error::Decode(e.into())))?;
    let metadata = serde_json::from_str::<Metadata>(row.get::<&str, _>("metadata"))
        .map_err(|e| LedgerError::Database(sqlx::Error::Decode(e.into())))?;

    Ok(LedgerEntry {
        id: row.get("id"),
        integration_id: row.get("integration_id"),
        player_id: row.get("player_id"),
        token: row.get("token"),
        amount: row.get("amount"),
        balance_after: row.get("balance_after"),
        direction,
        memo: row.get("memo"),
        metadata,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
    })
}

#[async_trait]
impl LedgerRepository for SqlLedger {
    async fn upsert_integration(
        &self,
        id: &str,
        name: &str,
        company_id: &str,
    ) -> LedgerResult<Integration> {
        // updated_at only moves when a mutable field actually changes
        sqlx::query(
            r#"
            INSERT INTO integrations (id, name, company_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT (id) DO UPDATE SET
                name = excluded.name,
                company_id = excluded.company_id,
                updated_at = excluded.updated_at
            WHERE integrations.name <> excluded.name
               OR integrations.company_id <> excluded.company_id
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(company_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.find_integration(id)
            .await?
            .ok_or_else(|| LedgerError::IntegrationNotFound(id.to_string()))
    }

    async fn find_integration(&self, id: &str) -> LedgerResult<Option<Integration>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, company_id, created_at, updated_at
            FROM integrations
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Integration {
            id: r.get("id"),
            name: r.get("name"),
            company_id: r.get("company_id"),
            created_at: r.get::<DateTime<Utc>, _>("created_at"),
            updated_at: r.get::<DateTime<Utc>, _>("updated_at"),
        }))
    }

    async fn upsert_player(
        &self,
        integration_id: &str,
        player_id: &str,
        alias: Option<&str>,
    ) -> LedgerResult<Player> {
        let mut tx = self.pool.begin().await?;

        // The SELECT needs its WHERE clause for SQLite to parse the upsert
        let inserted = sqlx::query(
            r#"
            INSERT INTO players (integration_id, player_id, alias, created_at)
            SELECT ?1, ?2, ?3, ?4
            WHERE EXISTS (SELECT 1 FROM integrations WHERE id = ?1)
            ON CONFLICT (integration_id, player_id) DO UPDATE SET
                alias = COALESCE(excluded.alias, players.alias)
            "#,
        )
        .bind(integration_id)
        .bind(player_id)
        .bind(alias)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(LedgerError::IntegrationNotFound(integration_id.to_string()));
        }

        if let Some(alias) = alias {
            sqlx::query(
                r#"
                INSERT INTO player_aliases (integration_id, player_id, alias)
                VALUES (?1, ?2, ?3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(integration_id)
            .bind(player_id)
            .bind(alias)
            .execute(&mut *tx)
            .await?;
        }

        let player = load_player(&mut tx, integration_id, player_id).await?;
        tx.commit().await?;

        snapshot_or_missing(player, integration_id, player_id)
    }

    async fn find_player(
        &self,
        integration_id: &str,
        player_id: &str,
    ) -> LedgerResult<Option<Player>> {
        let mut conn = self.pool.acquire().await?;
        load_player(&mut conn, integration_id, player_id).await
    }

    async fn credit(&self, posting: &Posting<'_>) -> LedgerResult<Player> {
        let mut tx = self.pool.begin().await?;

        // Insert-or-add in one statement; the upsert's WHERE refuses to overflow
        let credited = sqlx::query(
            r#"
            INSERT INTO balances (integration_id, player_id, token, amount)
            SELECT ?1, ?2, ?3, ?4
            WHERE EXISTS (
                SELECT 1 FROM players WHERE integration_id = ?1 AND player_id = ?2
            )
            ON CONFLICT (integration_id, player_id, token) DO UPDATE SET
                amount = balances.amount + excluded.amount
            WHERE balances.amount <= ?5
            RETURNING amount
            "#,
        )
        .bind(posting.integration_id)
        .bind(posting.player_id)
        .bind(posting.token)
        .bind(posting.amount)
        .bind(i64::MAX - posting.amount)
        .fetch_optional(&mut *tx)
        .await?;

        let new_balance: i64 = match credited {
            Some(row) => row.get("amount"),
            None => {
                // Either the player doesn't exist or the balance would overflow
                if player_exists(&mut tx, posting.integration_id, posting.player_id).await? {
                    return Err(LedgerError::BalanceOverflow {
                        token: posting.token.to_string(),
                    });
                }
                return Err(LedgerError::player_not_found(
                    posting.integration_id,
                    posting.player_id,
                ));
            }
        };

        Self::create_entry(&mut tx, posting, EntryDirection::Credit, new_balance).await?;
        let player = load_player(&mut tx, posting.integration_id, posting.player_id).await?;

        tx.commit().await?;

        snapshot_or_missing(player, posting.integration_id, posting.player_id)
    }

    async fn debit(&self, posting: &Posting<'_>) -> LedgerResult<Player> {
        let mut tx = self.pool.begin().await?;

        // Atomically debit with balance check.
        // Check and update happen in a single statement.
        let debited = sqlx::query(
            r#"
            UPDATE balances
            SET amount = amount - ?1
            WHERE integration_id = ?2 AND player_id = ?3 AND token = ?4 AND amount >= ?1
            RETURNING amount
            "#,
        )
        .bind(posting.amount)
        .bind(posting.integration_id)
        .bind(posting.player_id)
        .bind(posting.token)
        .fetch_optional(&mut *tx)
        .await?;

        let new_balance: i64 = match debited {
            Some(row) => row.get("amount"),
            None => {
                // Either the player doesn't exist or the balance is too low
                if !player_exists(&mut tx, posting.integration_id, posting.player_id).await? {
                    return Err(LedgerError::player_not_found(
                        posting.integration_id,
                        posting.player_id,
                    ));
                }

                let available: Option<i64> = sqlx::query_scalar(
                    r#"
                    SELECT amount FROM balances
                    WHERE integration_id = ?1 AND player_id = ?2 AND token = ?3
                    "#,
                )
                .bind(posting.integration_id)
                .bind(posting.player_id)
                .bind(posting.token)
                .fetch_optional(&mut *tx)
                .await?;

                return Err(LedgerError::InsufficientFunds {
                    token: posting.token.to_string(),
                    available: available.unwrap_or(0),
                    required: posting.amount,
                });
            }
        };

        Self::create_entry(&mut tx, posting, EntryDirection::Debit, new_balance).await?;
        let player = load_player(&mut tx, posting.integration_id, posting.player_id).await?;

        tx.commit().await?;

        snapshot_or_missing(player, posting.integration_id, posting.player_id)
    }

    async fn entries(
        &self,
        integration_id: &str,
        player_id: &str,
        limit: usize,
    ) -> LedgerResult<Vec<LedgerEntry>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT id, integration_id, player_id, token, amount, balance_after, direction, memo, metadata, created_at
            FROM ledger_entries
            WHERE integration_id = ?1 AND player_id = ?2
            ORDER BY id DESC
            LIMIT ?3
            "#,
        )
        .bind(integration_id)
        .bind(player_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(entry_from_row).collect()
    }
}
