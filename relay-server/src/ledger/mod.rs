//! Ledger (inventory-of-record) adapter
//!
//! The engine talks to the external ERP through [`LedgerAdapter`] only.
//! [`client::LedgerClient`] is the REST implementation.

pub mod client;

pub use client::LedgerClient;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::error::AppResult;
use shared::models::{LedgerProduct, StockRow};

/// One line of a ledger sale or return
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// A sale document submitted to the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleRequest {
    /// Deterministic reference ("<platform>-<external order id>") so the
    /// ledger can detect duplicates on its side too
    pub external_ref: String,
    pub location_id: Option<String>,
    /// Counterparty name (customer), when the order carried one
    pub counterparty: Option<String>,
    pub currency: String,
    pub lines: Vec<SaleLine>,
    pub payment_method: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleResult {
    pub transaction_id: String,
}

/// A return document reversing (part of) a previous sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRequest {
    pub external_ref: String,
    pub location_id: Option<String>,
    pub lines: Vec<SaleLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnResult {
    pub transaction_id: String,
}

/// Engine-facing contract for the inventory-of-record system
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Full stock listing, optionally restricted to one location
    async fn list_stock(&self, location_id: Option<&str>) -> AppResult<Vec<StockRow>>;

    /// Full product catalog (base products and variants)
    async fn list_products(&self) -> AppResult<Vec<LedgerProduct>>;

    /// Resolve a SKU to a ledger product, or `None` when unmapped
    async fn find_product_by_sku(&self, sku: &str) -> AppResult<Option<LedgerProduct>>;

    /// Record a sale; decrements ledger stock
    async fn record_sale(&self, request: &SaleRequest) -> AppResult<SaleResult>;

    /// Record a return; restores ledger stock
    async fn record_return(&self, request: &ReturnRequest) -> AppResult<ReturnResult>;
}

/// Selection rule for SKU matches: first variant wins, else the base
/// product. The rule lives here so no caller hardcodes per-SKU choices.
pub fn select_product(mut matches: Vec<LedgerProduct>) -> Option<LedgerProduct> {
    if let Some(idx) = matches.iter().position(|p| p.variant_of.is_some()) {
        return Some(matches.swap_remove(idx));
    }
    matches.into_iter().next()
}
