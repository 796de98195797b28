//! # Token Ledger
//!
//! Per-integration player token balances with atomic earn and spend.
//!
//! Game studios register an *integration*, attach *players* to it, and move
//! opaque integer *tokens* (e.g. `RACKDOG`) in and out of each player's
//! balances. A spend that would drive a balance negative is rejected as one
//! atomic step, so concurrent callers can never overdraw a balance.
//!
//! ## Architecture
//!
//! - **Integration registry**: upsert/lookup of integrations
//! - **Player registry**: players scoped per integration, alias sets
//! - **Balance ledger**: atomic credits/debits plus a transaction journal
//! - **Store façade** ([`LedgerStore`]): validation and existence checks in
//!   front of a pluggable [`LedgerRepository`](ledger::LedgerRepository)
//!
//! Two backends ship with the crate: [`MemoryLedger`](ledger::MemoryLedger)
//! and the SQLite-backed [`SqlLedger`](db::SqlLedger).
//!
//! ## Core Modules
//!
//! - [`ledger`]: Models, errors, the store façade and the in-memory backend
//! - [`db`]: SQLite pool, schema and SQL backend
//! - [`config`]: Environment-driven backend selection
//!
//! ## Example
//!
//! ```
//! use token_ledger::{LedgerError, LedgerStore};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = LedgerStore::in_memory();
//! store.register_integration("g1", "Ghost Ops", "co1").await.unwrap();
//! store.register_player("g1", "p1", None).await.unwrap();
//! store.earn("g1", "p1", "RACKDOG", 60, "signup").await.unwrap();
//!
//! let err = store.spend("g1", "p1", "RACKDOG", 1000, "cheat").await.unwrap_err();
//! assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
//! # }
//! ```

/// Environment-driven configuration.
pub mod config;

/// SQLite persistence.
pub mod db;

/// Ledger models, errors, store façade and in-memory backend.
pub mod ledger;

pub use config::{ConfigError, LedgerConfig, StorageBackend};
pub use ledger::{
    EntryDirection, ErrorKind, Integration, LedgerEntry, LedgerError, LedgerResult, LedgerStore,
    Metadata, Player,
};
