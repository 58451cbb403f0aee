//! Sync Failure Repository
//!
//! Attempt counters only increase; a resolved record never reopens.

use crate::db::models::FailureRow;
use serde_json::Value;
use shared::error::{AppError, ErrorCode};
use shared::models::{FailureKind, SyncFailure};
use shared::util::now_millis;
use sqlx::SqlitePool;

/// Payload for recording a new failure
#[derive(Debug, Clone)]
pub struct NewFailure {
    pub connection_id: String,
    pub order_id: Option<String>,
    pub kind: FailureKind,
    pub message: String,
    pub context: Value,
    pub requires_manual: bool,
}

/// Filter for listing failures
#[derive(Debug, Clone, Default)]
pub struct FailureFilter {
    pub connection_id: Option<String>,
    pub resolved: Option<bool>,
}

#[derive(Clone)]
pub struct FailureRepository {
    pool: SqlitePool,
}

impl FailureRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, failure: NewFailure) -> Result<SyncFailure, AppError> {
        let now = now_millis();
        let context = serde_json::to_string(&failure.context)
            .map_err(|e| AppError::internal(format!("Failed to serialize context: {e}")))?;

        let row: FailureRow = sqlx::query_as(
            r#"
            INSERT INTO sync_failures (
                connection_id, order_id, kind, message, context,
                attempts, resolved, auto_recovered, requires_manual,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&failure.connection_id)
        .bind(&failure.order_id)
        .bind(failure.kind.as_str())
        .bind(&failure.message)
        .bind(&context)
        .bind(failure.requires_manual as i64)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to record sync failure: {e}")))?;

        Ok(row.into_failure())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<SyncFailure>, AppError> {
        let row: Option<FailureRow> = sqlx::query_as("SELECT * FROM sync_failures WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to load sync failure: {e}")))?;

        Ok(row.map(FailureRow::into_failure))
    }

    pub async fn list(&self, filter: &FailureFilter) -> Result<Vec<SyncFailure>, AppError> {
        let mut sql = String::from("SELECT * FROM sync_failures WHERE 1 = 1");
        if filter.connection_id.is_some() {
            sql.push_str(" AND connection_id = ?");
        }
        if filter.resolved.is_some() {
            sql.push_str(" AND resolved = ?");
        }
        sql.push_str(" ORDER BY created_at DESC");

        let mut query = sqlx::query_as::<_, FailureRow>(&sql);
        if let Some(ref cid) = filter.connection_id {
            query = query.bind(cid.clone());
        }
        if let Some(resolved) = filter.resolved {
            query = query.bind(resolved as i64);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list sync failures: {e}")))?;

        Ok(rows.into_iter().map(FailureRow::into_failure).collect())
    }

    /// Failures eligible for the next recovery sweep
    pub async fn open_for_recovery(&self) -> Result<Vec<SyncFailure>, AppError> {
        let rows: Vec<FailureRow> = sqlx::query_as(
            r#"
            SELECT * FROM sync_failures
            WHERE resolved = 0 AND requires_manual = 0
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list open failures: {e}")))?;

        Ok(rows.into_iter().map(FailureRow::into_failure).collect())
    }

    /// Durably increment the attempt counter; returns the new count
    pub async fn increment_attempts(&self, id: i64) -> Result<i64, AppError> {
        let now = now_millis();
        let row: (i64,) = sqlx::query_as(
            "UPDATE sync_failures SET attempts = attempts + 1, updated_at = ? WHERE id = ? RETURNING attempts",
        )
        .bind(now)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to increment attempts: {e}")))?;

        Ok(row.0)
    }

    /// Mark resolved. A no-op when the record is already resolved —
    /// resolved is immutable once set.
    pub async fn mark_resolved(&self, id: i64, auto_recovered: bool) -> Result<bool, AppError> {
        let now = now_millis();
        let result = sqlx::query(
            r#"
            UPDATE sync_failures
            SET resolved = 1, resolved_at = ?, auto_recovered = ?, updated_at = ?
            WHERE id = ? AND resolved = 0
            "#,
        )
        .bind(now)
        .bind(auto_recovered as i64)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to mark failure resolved: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    /// Manual resolve via the API; errors when the record is unknown
    pub async fn resolve_manual(&self, id: i64) -> Result<SyncFailure, AppError> {
        let existing = self.find_by_id(id).await?.ok_or_else(|| {
            AppError::with_message(
                ErrorCode::SyncFailureNotFound,
                format!("Sync failure {id} not found"),
            )
        })?;
        if existing.resolved {
            return Err(AppError::with_message(
                ErrorCode::SyncAlreadyResolved,
                format!("Sync failure {id} is already resolved"),
            ));
        }
        self.mark_resolved(id, false).await?;
        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::database("Sync failure vanished after resolve")
        })
    }

    /// Flag a failure as needing manual intervention
    pub async fn mark_manual(&self, id: i64, hint: &str) -> Result<(), AppError> {
        let now = now_millis();
        sqlx::query(
            r#"
            UPDATE sync_failures
            SET requires_manual = 1,
                context = json_set(context, '$.manual_hint', ?),
                updated_at = ?
            WHERE id = ? AND resolved = 0
            "#,
        )
        .bind(hint)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to mark failure manual: {e}")))?;
        Ok(())
    }

    /// Merge the last error seen during recovery into the context payload
    pub async fn record_last_error(&self, id: i64, message: &str) -> Result<(), AppError> {
        let now = now_millis();
        sqlx::query(
            r#"
            UPDATE sync_failures
            SET context = json_set(context, '$.last_error', ?), updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(message)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update failure context: {e}")))?;
        Ok(())
    }
}
