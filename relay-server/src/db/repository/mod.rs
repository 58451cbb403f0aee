//! Repository Module
//!
//! CRUD operations over the SQLite tables. Each repository holds a
//! clone of the pool; all queries are runtime-checked `sqlx::query`
//! calls with positional binds.

pub mod connection;
pub mod failure;
pub mod inventory;
pub mod sales_ledger;

// Re-exports
pub use connection::{ConnectionRepository, NewConnection};
pub use failure::{FailureFilter, FailureRepository, NewFailure};
pub use inventory::InventoryRepository;
pub use sales_ledger::{InsertOutcome, NewSalesLedgerEntry, SalesLedgerRepository};
