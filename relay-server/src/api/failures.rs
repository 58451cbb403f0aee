//! Failure inspection and manual resolution

use crate::core::AppState;
use crate::db::repository::FailureFilter;
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use shared::error::{ApiResponse, AppResult};
use shared::models::SyncFailure;

#[derive(Debug, Deserialize, Default)]
pub struct FailureQuery {
    pub connection_id: Option<String>,
    pub resolved: Option<bool>,
}

/// A failure plus its operator-facing next step
#[derive(Debug, Serialize)]
pub struct FailureView {
    #[serde(flatten)]
    pub failure: SyncFailure,
    /// Next-step hint, present on escalated failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<&'static str>,
}

/// GET /api/failures
pub async fn list_failures(
    State(state): State<AppState>,
    Query(query): Query<FailureQuery>,
) -> AppResult<Json<ApiResponse<Vec<FailureView>>>> {
    let filter = FailureFilter {
        connection_id: query.connection_id,
        resolved: query.resolved,
    };
    let failures = state.engine.list_failures(&filter).await?;
    let views = failures
        .into_iter()
        .map(|failure| FailureView {
            next_step: failure
                .requires_manual
                .then(|| failure.kind.manual_intervention_hint()),
            failure,
        })
        .collect();
    Ok(Json(ApiResponse::success(views)))
}

/// POST /api/failures/{id}/resolve — operator override
pub async fn resolve_failure(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<SyncFailure>>> {
    let failure = state.engine.resolve_failure(id).await?;
    Ok(Json(ApiResponse::success(failure)))
}
