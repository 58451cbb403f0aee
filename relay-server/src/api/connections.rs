//! Connection registry routes

use crate::core::AppState;
use crate::db::repository::NewConnection;
use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppError, AppResult};
use shared::models::{Connection, PlatformKind};

/// Connection shape returned by the API; credentials stay server-side
#[derive(Debug, Serialize)]
pub struct ConnectionView {
    pub id: String,
    pub platform: PlatformKind,
    pub store_url: String,
    pub location_id: Option<String>,
    pub enabled: bool,
    pub last_synced_at: Option<i64>,
    pub created_at: i64,
}

impl From<Connection> for ConnectionView {
    fn from(c: Connection) -> Self {
        Self {
            id: c.id,
            platform: c.platform,
            store_url: c.store_url,
            location_id: c.location_id,
            enabled: c.enabled,
            last_synced_at: c.last_synced_at,
            created_at: c.created_at,
        }
    }
}

/// GET /api/connections
pub async fn list_connections(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<ConnectionView>>>> {
    let connections = state.engine.connections().find_all().await?;
    Ok(Json(ApiResponse::success(
        connections.into_iter().map(ConnectionView::from).collect(),
    )))
}

#[derive(Debug, Deserialize)]
pub struct CreateConnectionRequest {
    pub platform: String,
    pub store_url: String,
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    pub location_id: Option<String>,
}

/// POST /api/connections
pub async fn create_connection(
    State(state): State<AppState>,
    Json(request): Json<CreateConnectionRequest>,
) -> AppResult<Json<ApiResponse<ConnectionView>>> {
    let platform: PlatformKind = request
        .platform
        .parse()
        .map_err(|e: String| AppError::validation(e))?;
    if request.store_url.is_empty() {
        return Err(AppError::validation("store_url must not be empty"));
    }

    let connection = state
        .engine
        .connections()
        .create(NewConnection {
            platform,
            store_url: request.store_url,
            api_key: request.api_key,
            api_secret: request.api_secret,
            location_id: request.location_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(connection.into())))
}

#[derive(Debug, Deserialize)]
pub struct SetEnabledRequest {
    pub enabled: bool,
}

/// POST /api/connections/{id}/enabled
pub async fn set_enabled(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SetEnabledRequest>,
) -> AppResult<Json<ApiResponse<()>>> {
    state
        .engine
        .connections()
        .set_enabled(&id, request.enabled)
        .await?;
    Ok(Json(ApiResponse::ok()))
}
