//! Inventory Snapshot Repository
//!
//! Quantities never go negative (clamped at zero in SQL) and every
//! quantity write also advances last_synced_at.

use crate::db::models::{InventorySnapshot, InventorySnapshotRow};
use rust_decimal::Decimal;
use shared::error::AppError;
use shared::util::now_millis;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(
        &self,
        connection_id: &str,
        sku: &str,
    ) -> Result<Option<InventorySnapshot>, AppError> {
        let row: Option<InventorySnapshotRow> = sqlx::query_as(
            "SELECT * FROM inventory_snapshots WHERE connection_id = ? AND sku = ?",
        )
        .bind(connection_id)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load snapshot: {e}")))?;

        Ok(row.map(InventorySnapshotRow::into_snapshot))
    }

    pub async fn list_for_connection(
        &self,
        connection_id: &str,
    ) -> Result<Vec<InventorySnapshot>, AppError> {
        let rows: Vec<InventorySnapshotRow> = sqlx::query_as(
            "SELECT * FROM inventory_snapshots WHERE connection_id = ? ORDER BY sku",
        )
        .bind(connection_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list snapshots: {e}")))?;

        Ok(rows
            .into_iter()
            .map(InventorySnapshotRow::into_snapshot)
            .collect())
    }

    /// Create or overwrite the snapshot for (connection, sku) at `quantity`
    pub async fn upsert(
        &self,
        connection_id: &str,
        sku: &str,
        product_id: &str,
        product_name: &str,
        quantity: i64,
        unit_price: Decimal,
    ) -> Result<(), AppError> {
        let now = now_millis();
        sqlx::query(
            r#"
            INSERT INTO inventory_snapshots (
                connection_id, sku, product_id, product_name, quantity, unit_price, last_synced_at
            )
            VALUES (?, ?, ?, ?, MAX(0, ?), ?, ?)
            ON CONFLICT (connection_id, sku)
            DO UPDATE SET product_id = excluded.product_id,
                          product_name = excluded.product_name,
                          quantity = excluded.quantity,
                          unit_price = excluded.unit_price,
                          last_synced_at = excluded.last_synced_at
            "#,
        )
        .bind(connection_id)
        .bind(sku)
        .bind(product_id)
        .bind(product_name)
        .bind(quantity)
        .bind(unit_price.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to upsert snapshot: {e}")))?;
        Ok(())
    }

    /// Adjust an existing snapshot's quantity by `delta`, clamped at zero.
    /// Returns the new quantity, or `None` when no snapshot exists.
    pub async fn adjust(
        &self,
        connection_id: &str,
        sku: &str,
        delta: i64,
    ) -> Result<Option<i64>, AppError> {
        let now = now_millis();
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE inventory_snapshots
            SET quantity = MAX(0, quantity + ?), last_synced_at = ?
            WHERE connection_id = ? AND sku = ?
            RETURNING quantity
            "#,
        )
        .bind(delta)
        .bind(now)
        .bind(connection_id)
        .bind(sku)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to adjust snapshot: {e}")))?;

        Ok(row.map(|r| r.0))
    }
}
