//! Data models
//!
//! Shared between the relay server core and its API surface. Platform
//! adapters normalize storefront payloads into these shapes at the
//! boundary; nothing inside the engine branches on platform kind.

pub mod connection;
pub mod order;
pub mod product;
pub mod sync;

// Re-exports
pub use connection::*;
pub use order::*;
pub use product::*;
pub use sync::*;
