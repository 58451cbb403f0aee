//! Database row types
//!
//! Row structs mirror table columns with primitive types (money as TEXT,
//! flags as INTEGER) and convert into the shared domain shapes.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{ApiCredentials, Connection, FailureKind, PlatformKind, SyncFailure};
use sqlx::FromRow;

/// Row of `connections`
#[derive(Debug, Clone, FromRow)]
pub struct ConnectionRow {
    pub id: String,
    pub platform: String,
    pub store_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub location_id: Option<String>,
    pub enabled: i64,
    pub last_synced_at: Option<i64>,
    pub created_at: i64,
}

impl ConnectionRow {
    pub fn into_connection(self) -> Option<Connection> {
        let platform: PlatformKind = match self.platform.parse() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!(id = %self.id, platform = %self.platform, "Skipping connection with unknown platform");
                return None;
            }
        };
        Some(Connection {
            id: self.id,
            platform,
            store_url: self.store_url,
            credentials: ApiCredentials {
                key: self.api_key,
                secret: self.api_secret,
            },
            location_id: self.location_id,
            enabled: self.enabled != 0,
            last_synced_at: self.last_synced_at,
            created_at: self.created_at,
        })
    }
}

/// Proof that an order was mirrored into the ledger
#[derive(Debug, Clone, Serialize)]
pub struct SalesLedgerEntry {
    pub id: i64,
    pub connection_id: String,
    pub external_order_id: String,
    pub order_number: String,
    pub total: Decimal,
    pub currency: String,
    pub status: String,
    pub ordered_at: i64,
    pub ledger_txn_id: Option<String>,
    pub created_at: i64,
}

/// Row of `sales_ledger`
#[derive(Debug, Clone, FromRow)]
pub struct SalesLedgerRow {
    pub id: i64,
    pub connection_id: String,
    pub external_order_id: String,
    pub order_number: String,
    pub total: String,
    pub currency: String,
    pub status: String,
    pub ordered_at: i64,
    pub ledger_txn_id: Option<String>,
    pub created_at: i64,
}

impl SalesLedgerRow {
    pub fn into_entry(self) -> SalesLedgerEntry {
        SalesLedgerEntry {
            id: self.id,
            connection_id: self.connection_id,
            external_order_id: self.external_order_id,
            order_number: self.order_number,
            total: self.total.parse().unwrap_or_default(),
            currency: self.currency,
            status: self.status,
            ordered_at: self.ordered_at,
            ledger_txn_id: self.ledger_txn_id,
            created_at: self.created_at,
        }
    }
}

/// Last-known ledger quantity for one SKU on one connection
#[derive(Debug, Clone, Serialize)]
pub struct InventorySnapshot {
    pub id: i64,
    pub connection_id: String,
    pub sku: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub last_synced_at: i64,
}

/// Row of `inventory_snapshots`
#[derive(Debug, Clone, FromRow)]
pub struct InventorySnapshotRow {
    pub id: i64,
    pub connection_id: String,
    pub sku: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: String,
    pub last_synced_at: i64,
}

impl InventorySnapshotRow {
    pub fn into_snapshot(self) -> InventorySnapshot {
        InventorySnapshot {
            id: self.id,
            connection_id: self.connection_id,
            sku: self.sku,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            unit_price: self.unit_price.parse().unwrap_or_default(),
            last_synced_at: self.last_synced_at,
        }
    }
}

/// Row of `sync_failures`
#[derive(Debug, Clone, FromRow)]
pub struct FailureRow {
    pub id: i64,
    pub connection_id: String,
    pub order_id: Option<String>,
    pub kind: String,
    pub message: String,
    pub context: String,
    pub attempts: i64,
    pub resolved: i64,
    pub resolved_at: Option<i64>,
    pub auto_recovered: i64,
    pub requires_manual: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl FailureRow {
    pub fn into_failure(self) -> SyncFailure {
        SyncFailure {
            id: self.id,
            connection_id: self.connection_id,
            order_id: self.order_id,
            kind: self.kind.parse().unwrap_or(FailureKind::Unknown),
            message: self.message,
            context: serde_json::from_str(&self.context).unwrap_or(serde_json::Value::Null),
            attempts: self.attempts,
            resolved: self.resolved != 0,
            resolved_at: self.resolved_at,
            auto_recovered: self.auto_recovered != 0,
            requires_manual: self.requires_manual != 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
