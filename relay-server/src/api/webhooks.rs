//! Webhook receivers
//!
//! Deliveries are acknowledged immediately and queued for the
//! WebhookWorker, so a slow ledger or storefront call never makes the
//! platform's delivery time out and redeliver.

use crate::core::AppState;
use crate::sync::WebhookJob;
use axum::Json;
use axum::extract::{Path, State};
use serde_json::Value;
use shared::error::{ApiResponse, AppError, AppResult};

pub async fn receive_order(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
    Json(payload): Json<Value>,
) -> AppResult<Json<ApiResponse<()>>> {
    enqueue(
        &state,
        WebhookJob::Order {
            connection_id,
            payload,
        },
    )
    .await
}

pub async fn receive_refund(
    State(state): State<AppState>,
    Path(connection_id): Path<String>,
    Json(payload): Json<Value>,
) -> AppResult<Json<ApiResponse<()>>> {
    enqueue(
        &state,
        WebhookJob::Refund {
            connection_id,
            payload,
        },
    )
    .await
}

async fn enqueue(state: &AppState, job: WebhookJob) -> AppResult<Json<ApiResponse<()>>> {
    // Reject deliveries for unknown connections so the platform stops
    // retrying them; everything else is accepted and processed async
    let connection_id = match &job {
        WebhookJob::Order { connection_id, .. } | WebhookJob::Refund { connection_id, .. } => {
            connection_id.clone()
        }
    };
    state.engine.connections().require(&connection_id).await?;

    state
        .webhook_tx
        .send(job)
        .map_err(|_| AppError::internal("webhook queue is closed"))?;

    Ok(Json(ApiResponse::ok()))
}
