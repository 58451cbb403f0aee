//! Sales Ledger Repository
//!
//! Append-only record of orders mirrored into the ledger. The unique
//! index on (connection_id, external_order_id) is the idempotency lock;
//! a constraint violation on insert means another path already mirrored
//! the order and is reported as [`InsertOutcome::Duplicate`].

use crate::db::models::{SalesLedgerEntry, SalesLedgerRow};
use rust_decimal::Decimal;
use shared::error::AppError;
use shared::util::now_millis;
use sqlx::SqlitePool;

/// Payload for recording a mirrored order
#[derive(Debug, Clone)]
pub struct NewSalesLedgerEntry {
    pub connection_id: String,
    pub external_order_id: String,
    pub order_number: String,
    pub total: Decimal,
    pub currency: String,
    pub status: String,
    pub ordered_at: i64,
    pub ledger_txn_id: Option<String>,
}

/// Result of an insert attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    /// The unique constraint fired: the order was already mirrored
    Duplicate,
}

#[derive(Clone)]
pub struct SalesLedgerRepository {
    pool: SqlitePool,
}

impl SalesLedgerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_order(
        &self,
        connection_id: &str,
        external_order_id: &str,
    ) -> Result<Option<SalesLedgerEntry>, AppError> {
        let row: Option<SalesLedgerRow> = sqlx::query_as(
            "SELECT * FROM sales_ledger WHERE connection_id = ? AND external_order_id = ?",
        )
        .bind(connection_id)
        .bind(external_order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load sales ledger entry: {e}")))?;

        Ok(row.map(SalesLedgerRow::into_entry))
    }

    pub async fn insert(&self, entry: NewSalesLedgerEntry) -> Result<InsertOutcome, AppError> {
        let now = now_millis();
        let result = sqlx::query(
            r#"
            INSERT INTO sales_ledger (
                connection_id, external_order_id, order_number, total,
                currency, status, ordered_at, ledger_txn_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.connection_id)
        .bind(&entry.external_order_id)
        .bind(&entry.order_number)
        .bind(entry.total.to_string())
        .bind(&entry.currency)
        .bind(&entry.status)
        .bind(entry.ordered_at)
        .bind(&entry.ledger_txn_id)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(InsertOutcome::Inserted(done.last_insert_rowid().max(0))),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Ok(InsertOutcome::Duplicate)
            }
            Err(e) => Err(AppError::database(format!(
                "Failed to insert sales ledger entry: {e}"
            ))),
        }
    }

    /// Attach the ledger-side transaction id once known
    pub async fn attach_ledger_txn(&self, id: i64, txn_id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE sales_ledger SET ledger_txn_id = ? WHERE id = ?")
            .bind(txn_id)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to attach ledger txn id: {e}")))?;
        Ok(())
    }

    pub async fn count_for_connection(&self, connection_id: &str) -> Result<i64, AppError> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM sales_ledger WHERE connection_id = ?")
                .bind(connection_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to count entries: {e}")))?;
        Ok(row.0)
    }
}
