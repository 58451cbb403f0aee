//! Ledger product and stock models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product known to the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerProduct {
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    /// Set when this record is a variant of another product
    pub variant_of: Option<String>,
    pub price: Decimal,
}

/// One row of the ledger's stock listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockRow {
    pub product_id: String,
    pub sku: Option<String>,
    pub quantity: i64,
}

/// Product shape pushed to a storefront
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontProduct {
    pub sku: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: i64,
}
