//! Integration tests for the ledger store.
//!
//! Every scenario runs against both the in-memory and the SQLite backend so
//! the two implementations stay behaviorally identical.

use std::sync::Arc;
use token_ledger::db::{Database, DatabaseConfig, SqlLedger};
use token_ledger::ledger::{EarnRequest, EntryDirection, LedgerError, LedgerStore, SpendRequest};
use token_ledger::{ErrorKind, LedgerConfig, Metadata, StorageBackend};

/// Helper to create one store per backend
async fn stores() -> Vec<(&'static str, LedgerStore)> {
    let db = Database::new(&DatabaseConfig::in_memory())
        .await
        .expect("Failed to open in-memory database");
    db.migrate().await.expect("Failed to migrate");

    vec![
        ("memory", LedgerStore::in_memory()),
        (
            "sqlite",
            LedgerStore::new(Arc::new(SqlLedger::new(db.pool().clone()))),
        ),
    ]
}

/// Helper to register g1/p1
async fn seed(store: &LedgerStore) {
    store
        .register_integration("g1", "Ghost Ops", "co1")
        .await
        .expect("Integration registration should succeed");
    store
        .register_player("g1", "p1", Some("Neo"))
        .await
        .expect("Player registration should succeed");
}

#[tokio::test]
async fn test_earn_then_spend_scenario() {
    for (backend, store) in stores().await {
        seed(&store).await;

        let player = store.get_player("g1", "p1").await.unwrap();
        assert!(player.balances.is_empty(), "{backend}: fresh player has no balances");

        let player = store
            .earn("g1", "p1", "RACKDOG", 100, "signup")
            .await
            .unwrap();
        assert_eq!(player.balance("RACKDOG"), 100, "{backend}");

        let player = store.spend("g1", "p1", "RACKDOG", 40, "skin").await.unwrap();
        assert_eq!(player.balance("RACKDOG"), 60, "{backend}");
        assert_eq!(player.balances.len(), 1, "{backend}");
    }
}

#[tokio::test]
async fn test_overspend_rejected_and_balance_unchanged() {
    for (backend, store) in stores().await {
        seed(&store).await;
        store.earn("g1", "p1", "RACKDOG", 60, "signup").await.unwrap();

        let err = store
            .spend("g1", "p1", "RACKDOG", 1000, "cheat")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds, "{backend}");
        assert!(
            matches!(
                err,
                LedgerError::InsufficientFunds { available: 60, required: 1000, .. }
            ),
            "{backend}: {err}"
        );

        assert_eq!(
            store.get_balance("g1", "p1", "RACKDOG").await.unwrap(),
            60,
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_unknown_player_not_found() {
    for (backend, store) in stores().await {
        seed(&store).await;

        let err = store.get_player("g1", "unknown").await.unwrap_err();
        assert!(
            matches!(err, LedgerError::PlayerNotFound { .. }),
            "{backend}: {err}"
        );

        let err = store.get_player("g2", "p1").await.unwrap_err();
        assert!(
            matches!(err, LedgerError::IntegrationNotFound(_)),
            "{backend}: {err}"
        );

        let err = store.earn("g1", "unknown", "XP", 1, "x").await.unwrap_err();
        assert!(err.is_not_found(), "{backend}: {err}");
    }
}

#[tokio::test]
async fn test_zero_amount_is_validation_error() {
    for (backend, store) in stores().await {
        seed(&store).await;

        let err = store.earn("g1", "p1", "RACKDOG", 0, "x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{backend}");

        let err = store.spend("g1", "p1", "RACKDOG", -1, "x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{backend}");

        let err = store.earn("g1", "p1", "", 5, "x").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation, "{backend}");

        assert!(store.history("g1", "p1", 10).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_reregistering_integration_is_upsert() {
    for (backend, store) in stores().await {
        seed(&store).await;
        store.earn("g1", "p1", "XP", 7, "quest").await.unwrap();

        let first = store.get_integration("g1").await.unwrap();
        let again = store
            .register_integration("g1", "Ghost Ops", "co1")
            .await
            .unwrap();
        assert_eq!(first, again, "{backend}: identical re-registration is a no-op");

        let renamed = store
            .register_integration("g1", "Ghost Ops: Reloaded", "co2")
            .await
            .unwrap();
        assert_eq!(renamed.name, "Ghost Ops: Reloaded", "{backend}");
        assert_eq!(renamed.company_id, "co2", "{backend}");
        assert_eq!(renamed.created_at, first.created_at, "{backend}");

        let player = store.get_player("g1", "p1").await.unwrap();
        assert_eq!(player.balance("XP"), 7, "{backend}: balances survive rename");
    }
}

#[tokio::test]
async fn test_reregistering_player_merges_aliases() {
    for (backend, store) in stores().await {
        seed(&store).await;
        store.earn("g1", "p1", "XP", 3, "quest").await.unwrap();

        let player = store
            .register_player("g1", "p1", Some("TheOne"))
            .await
            .unwrap();
        assert_eq!(
            player.aliases,
            vec!["Neo".to_string(), "TheOne".to_string()],
            "{backend}"
        );
        assert_eq!(player.alias.as_deref(), Some("TheOne"), "{backend}");
        assert_eq!(player.balance("XP"), 3, "{backend}: balances untouched");

        let player = store.register_player("g1", "p1", Some("Neo")).await.unwrap();
        assert_eq!(player.aliases.len(), 2, "{backend}: alias set has no duplicates");

        let player = store.register_player("g1", "p1", None).await.unwrap();
        assert_eq!(player.aliases.len(), 2, "{backend}");
    }
}

#[tokio::test]
async fn test_player_ids_scoped_per_integration() {
    for (backend, store) in stores().await {
        seed(&store).await;
        store
            .register_integration("g2", "Other Game", "co1")
            .await
            .unwrap();
        store.register_player("g2", "p1", Some("Smith")).await.unwrap();

        store.earn("g1", "p1", "RACKDOG", 10, "signup").await.unwrap();
        store.earn("g2", "p1", "RACKDOG", 99, "signup").await.unwrap();

        assert_eq!(store.get_balance("g1", "p1", "RACKDOG").await.unwrap(), 10, "{backend}");
        assert_eq!(store.get_balance("g2", "p1", "RACKDOG").await.unwrap(), 99, "{backend}");
        assert_eq!(
            store.get_player("g2", "p1").await.unwrap().aliases,
            vec!["Smith".to_string()],
            "{backend}"
        );
    }
}

#[tokio::test]
async fn test_tokens_are_case_sensitive_and_independent() {
    for (backend, store) in stores().await {
        seed(&store).await;
        store.earn("g1", "p1", "RACKDOG", 5, "a").await.unwrap();
        store.earn("g1", "p1", "rackdog", 8, "b").await.unwrap();
        store.spend("g1", "p1", "rackdog", 8, "c").await.unwrap();

        let player = store.get_player("g1", "p1").await.unwrap();
        assert_eq!(player.balance("RACKDOG"), 5, "{backend}");
        // Zero balances of transacted tokens stay visible
        assert_eq!(player.balances.get("rackdog"), Some(&0), "{backend}");
    }
}

#[tokio::test]
async fn test_history_records_source_and_reason() {
    for (backend, store) in stores().await {
        seed(&store).await;
        store.earn("g1", "p1", "RACKDOG", 100, "signup").await.unwrap();
        store.spend("g1", "p1", "RACKDOG", 40, "skin").await.unwrap();
        let _ = store.spend("g1", "p1", "RACKDOG", 1000, "cheat").await;

        let history = store.history("g1", "p1", 50).await.unwrap();
        assert_eq!(history.len(), 2, "{backend}: failed spends are not journaled");

        assert_eq!(history[0].memo, "skin", "{backend}");
        assert_eq!(history[0].direction, EntryDirection::Debit, "{backend}");
        assert_eq!(history[0].balance_after, 60, "{backend}");

        assert_eq!(history[1].memo, "signup", "{backend}");
        assert_eq!(history[1].amount, 100, "{backend}");

        let net: i64 = history.iter().map(|e| e.amount).sum();
        assert_eq!(net, 60, "{backend}: journal sums to the balance");
    }
}

#[tokio::test]
async fn test_request_metadata_recorded_in_history() {
    for (backend, store) in stores().await {
        seed(&store).await;

        let earn: EarnRequest = serde_json::from_str(
            r#"{"token":"RACKDOG","amount":100,"source":"match_win","metadata":{"mode":"ranked","map":"dust"}}"#,
        )
        .unwrap();
        store.apply_earn("g1", "p1", &earn).await.unwrap();

        let spend = SpendRequest {
            token: "RACKDOG".to_string(),
            amount: 40,
            reason: "skin_purchase".to_string(),
            metadata: Metadata::from([("skin".to_string(), "neon_fox".to_string())]),
        };
        let player = store.apply_spend("g1", "p1", &spend).await.unwrap();
        assert_eq!(player.balance("RACKDOG"), 60, "{backend}");

        let rejected = SpendRequest {
            amount: 1000,
            ..spend.clone()
        };
        assert!(store.apply_spend("g1", "p1", &rejected).await.is_err());

        let history = store.history("g1", "p1", 10).await.unwrap();
        assert_eq!(history.len(), 2, "{backend}");
        assert_eq!(history[0].metadata, spend.metadata, "{backend}");
        assert_eq!(history[0].memo, "skin_purchase", "{backend}");
        assert_eq!(history[1].metadata.get("mode").map(String::as_str), Some("ranked"), "{backend}");
        assert_eq!(history[1].metadata.len(), 2, "{backend}");

        // Plain earns journal no metadata
        store.earn("g1", "p1", "XP", 1, "quest").await.unwrap();
        let latest = store.history("g1", "p1", 1).await.unwrap();
        assert!(latest[0].metadata.is_empty(), "{backend}");
    }
}

#[tokio::test]
async fn test_store_from_config() {
    let store = LedgerStore::from_config(&LedgerConfig::memory())
        .await
        .unwrap();
    seed(&store).await;

    let sqlite = LedgerConfig {
        backend: StorageBackend::Sqlite(DatabaseConfig::in_memory()),
        ..LedgerConfig::memory()
    };
    let store = LedgerStore::from_config(&sqlite).await.unwrap();
    seed(&store).await;
    let player = store.earn("g1", "p1", "XP", 1, "x").await.unwrap();
    assert_eq!(player.balance("XP"), 1);
}

#[tokio::test]
async fn test_isolated_instances_share_nothing() {
    let a = LedgerStore::in_memory();
    let b = LedgerStore::in_memory();
    seed(&a).await;

    assert!(b.get_integration("g1").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_sqlite_file_persists_across_reopen() {
    let path = std::env::temp_dir().join(format!(
        "token_ledger_{}_{}.db",
        std::process::id(),
        chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
    ));
    let config = LedgerConfig {
        backend: StorageBackend::Sqlite(DatabaseConfig {
            database_url: format!("sqlite://{}", path.display()),
            ..DatabaseConfig::development()
        }),
        ..LedgerConfig::memory()
    };

    {
        let store = LedgerStore::from_config(&config).await.unwrap();
        seed(&store).await;
        store.earn("g1", "p1", "RACKDOG", 42, "signup").await.unwrap();
    }

    let store = LedgerStore::from_config(&config).await.unwrap();
    assert_eq!(store.get_balance("g1", "p1", "RACKDOG").await.unwrap(), 42);

    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
}
