//! Manual sync triggers

use crate::core::AppState;
use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use shared::error::{ApiResponse, AppResult};
use shared::models::{OrderPullSummary, RunReport};

#[derive(Debug, Deserialize, Default)]
pub struct RunSyncRequest {
    /// Restrict the run to one connection; all enabled otherwise
    pub connection_id: Option<String>,
}

/// POST /api/sync/run — run a reconciliation pass now
pub async fn run_reconciliation(
    State(state): State<AppState>,
    body: Option<Json<RunSyncRequest>>,
) -> AppResult<Json<ApiResponse<RunReport>>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let report = state
        .engine
        .run_reconciliation(request.connection_id.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(report)))
}

#[derive(Debug, Deserialize)]
pub struct PullOrdersRequest {
    pub connection_id: String,
}

/// POST /api/sync/orders/pull — fetch and mirror recent orders
pub async fn pull_orders(
    State(state): State<AppState>,
    Json(request): Json<PullOrdersRequest>,
) -> AppResult<Json<ApiResponse<OrderPullSummary>>> {
    let summary = state.engine.pull_orders_for(&request.connection_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}
