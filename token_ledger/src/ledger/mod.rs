//! Ledger module providing per-integration player token balances.
//!
//! This module implements:
//! - Integration registry (upsert by id)
//! - Player registry scoped per integration, with alias merging
//! - Atomic earn/spend postings that never drive a balance negative
//! - A transaction journal written in the same step as each posting
//! - Interchangeable storage backends behind [`LedgerRepository`]
//!
//! ## Example
//!
//! ```
//! use token_ledger::ledger::{LedgerError, LedgerStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), LedgerError> {
//! let store = LedgerStore::in_memory();
//! store.register_integration("g1", "Ghost Ops", "co1").await?;
//! store.register_player("g1", "p1", Some("Neo")).await?;
//!
//! store.earn("g1", "p1", "RACKDOG", 100, "signup").await?;
//! let player = store.spend("g1", "p1", "RACKDOG", 40, "skin").await?;
//! assert_eq!(player.balance("RACKDOG"), 60);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod memory;
pub mod models;
pub mod repository;
pub mod requests;
pub mod store;
pub mod timeouts;

pub use errors::{ErrorKind, LedgerError, LedgerResult};
pub use memory::MemoryLedger;
pub use models::{EntryDirection, Integration, LedgerEntry, Metadata, Player, Token};
pub use repository::{LedgerRepository, Posting};
pub use requests::{EarnRequest, RegisterIntegrationRequest, RegisterPlayerRequest, SpendRequest};
pub use store::LedgerStore;
