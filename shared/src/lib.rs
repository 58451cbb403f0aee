//! Shared types for the stock-relay service
//!
//! Domain models and the unified error system used by the relay server:
//! normalized order/refund events, ledger product and stock shapes, the
//! sync-failure taxonomy with its retry policy table, and response types.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCode};
pub use models::sync::FailureKind;
