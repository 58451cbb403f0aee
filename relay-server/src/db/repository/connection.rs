//! Connection Repository

use crate::db::models::ConnectionRow;
use shared::error::{AppError, ErrorCode};
use shared::models::{Connection, PlatformKind};
use shared::util::now_millis;
use sqlx::SqlitePool;

/// Payload for registering a new storefront connection
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub platform: PlatformKind,
    pub store_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub location_id: Option<String>,
}

#[derive(Clone)]
pub struct ConnectionRepository {
    pool: SqlitePool,
}

impl ConnectionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, data: NewConnection) -> Result<Connection, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = now_millis();

        sqlx::query(
            r#"
            INSERT INTO connections (id, platform, store_url, api_key, api_secret, location_id, enabled, created_at)
            VALUES (?, ?, ?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(&id)
        .bind(data.platform.as_str())
        .bind(&data.store_url)
        .bind(&data.api_key)
        .bind(&data.api_secret)
        .bind(&data.location_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create connection: {e}")))?;

        self.find_by_id(&id)
            .await?
            .ok_or_else(|| AppError::database("Connection vanished after insert"))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Connection>, AppError> {
        let row: Option<ConnectionRow> =
            sqlx::query_as("SELECT * FROM connections WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to load connection: {e}")))?;

        Ok(row.and_then(ConnectionRow::into_connection))
    }

    /// Load a connection or fail with [`ErrorCode::ConnectionNotFound`]
    pub async fn require(&self, id: &str) -> Result<Connection, AppError> {
        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::with_message(
                ErrorCode::ConnectionNotFound,
                format!("Connection {id} not found"),
            )
        })
    }

    pub async fn find_all(&self) -> Result<Vec<Connection>, AppError> {
        let rows: Vec<ConnectionRow> =
            sqlx::query_as("SELECT * FROM connections ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to list connections: {e}")))?;

        Ok(rows
            .into_iter()
            .filter_map(ConnectionRow::into_connection)
            .collect())
    }

    pub async fn find_enabled(&self) -> Result<Vec<Connection>, AppError> {
        let rows: Vec<ConnectionRow> =
            sqlx::query_as("SELECT * FROM connections WHERE enabled = 1 ORDER BY created_at")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to list connections: {e}")))?;

        Ok(rows
            .into_iter()
            .filter_map(ConnectionRow::into_connection)
            .collect())
    }

    pub async fn set_last_synced(&self, id: &str, ts: i64) -> Result<(), AppError> {
        sqlx::query("UPDATE connections SET last_synced_at = ? WHERE id = ?")
            .bind(ts)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update last_synced_at: {e}")))?;
        Ok(())
    }

    pub async fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE connections SET enabled = ? WHERE id = ?")
            .bind(enabled as i64)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to update enabled flag: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::with_message(
                ErrorCode::ConnectionNotFound,
                format!("Connection {id} not found"),
            ));
        }
        Ok(())
    }
}
