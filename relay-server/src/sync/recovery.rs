//! Error Recovery Engine
//!
//! One strategy table, invoked uniformly from every processor: a failure
//! is classified once when recorded, then each sweep replays it with the
//! category's bounded backoff. The attempt counter increments durably
//! before each try, so a crash mid-retry still shows in the record.
//!
//! Per-failure state machine:
//! Open -> Retrying -> { Resolved | Escalated (manual) | Open (next sweep) }

use super::SyncEngine;
use serde::Serialize;
use serde_json::Value;
use shared::error::{AppError, AppResult};
use shared::models::{FailureKind, OrderEvent, RefundEvent, SyncFailure, requires_manual_cause};

/// Result of one recovery sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    pub examined: u32,
    pub recovered: u32,
    pub escalated: u32,
    pub still_open: u32,
}

impl SyncEngine {
    /// Classify and persist a failure. Best-effort: a failure to record
    /// the failure is logged, never propagated over the original error.
    pub(crate) async fn record_failure(
        &self,
        connection_id: &str,
        order_id: Option<&str>,
        err: &AppError,
        fallback: FailureKind,
        context: Value,
    ) {
        let kind = FailureKind::classify_or(err, fallback);
        // Kinds that no retry can fix are escalated on arrival
        let requires_manual = !kind.is_retryable() || requires_manual_cause(&err.message);

        let record = crate::db::repository::NewFailure {
            connection_id: connection_id.to_string(),
            order_id: order_id.map(String::from),
            kind,
            message: err.message.clone(),
            context,
            requires_manual,
        };

        match self.failures.record(record).await {
            Ok(failure) => {
                tracing::error!(
                    failure_id = failure.id,
                    connection_id,
                    kind = %kind,
                    requires_manual,
                    error = %err,
                    "Sync failure recorded"
                );
            }
            Err(record_err) => {
                tracing::error!(
                    connection_id,
                    error = %err,
                    record_error = %record_err,
                    "Failed to persist sync failure"
                );
            }
        }
    }

    /// One scheduled recovery pass over all open, auto-retryable failures
    pub async fn run_recovery_sweep(&self) -> AppResult<SweepSummary> {
        let open = self.failures.open_for_recovery().await?;
        let mut summary = SweepSummary {
            examined: open.len() as u32,
            ..Default::default()
        };

        for failure in &open {
            if !failure.kind.is_retryable() {
                // Recorded before escalation-on-arrival existed, or kind
                // fell back to Unknown: nothing a retry can do
                self.failures
                    .mark_manual(failure.id, failure.kind.manual_intervention_hint())
                    .await?;
                summary.escalated += 1;
                continue;
            }

            match self.recover_one(failure).await? {
                RecoveryOutcome::Recovered => summary.recovered += 1,
                RecoveryOutcome::Escalated => summary.escalated += 1,
                RecoveryOutcome::StillOpen => summary.still_open += 1,
            }
        }

        if summary.examined > 0 {
            tracing::info!(
                examined = summary.examined,
                recovered = summary.recovered,
                escalated = summary.escalated,
                still_open = summary.still_open,
                "Recovery sweep finished"
            );
        }
        Ok(summary)
    }

    /// Retry one failure up to its category's attempt budget
    async fn recover_one(&self, failure: &SyncFailure) -> AppResult<RecoveryOutcome> {
        let policy = failure.kind.policy();
        let mut last_error: Option<AppError> = None;

        for attempt in 0..policy.max_attempts {
            // Durable increment before the try: a crash mid-retry is visible
            let total_attempts = self.failures.increment_attempts(failure.id).await?;

            match self.replay(failure).await {
                Ok(()) => {
                    self.failures.mark_resolved(failure.id, true).await?;
                    tracing::info!(
                        failure_id = failure.id,
                        kind = %failure.kind,
                        attempts = total_attempts,
                        "Failure auto-recovered"
                    );
                    return Ok(RecoveryOutcome::Recovered);
                }
                Err(err) => {
                    tracing::warn!(
                        failure_id = failure.id,
                        kind = %failure.kind,
                        attempt = attempt + 1,
                        max_attempts = policy.max_attempts,
                        error = %err,
                        "Recovery attempt failed"
                    );
                    let is_last = attempt + 1 >= policy.max_attempts;
                    if !is_last {
                        let backoff = policy
                            .backoff_ms
                            .get(attempt as usize)
                            .copied()
                            .unwrap_or(1_000);
                        tokio::time::sleep(std::time::Duration::from_millis(backoff)).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        // Retries exhausted for this sweep
        let Some(err) = last_error else {
            return Ok(RecoveryOutcome::StillOpen);
        };
        self.failures.record_last_error(failure.id, &err.message).await?;

        if requires_manual_cause(&err.message) {
            self.failures
                .mark_manual(failure.id, failure.kind.manual_intervention_hint())
                .await?;
            tracing::error!(
                failure_id = failure.id,
                kind = %failure.kind,
                error = %err,
                "Failure escalated, manual intervention required"
            );
            return Ok(RecoveryOutcome::Escalated);
        }

        // Auto-retryable cause: stays Open for the next scheduled sweep
        Ok(RecoveryOutcome::StillOpen)
    }

    /// Re-run the operation captured in the failure's context
    async fn replay(&self, failure: &SyncFailure) -> AppResult<()> {
        let connection = self.connections.require(&failure.connection_id).await?;
        if !connection.enabled {
            return Err(AppError::with_message(
                shared::ErrorCode::ConnectionDisabled,
                "connection disabled, cannot replay",
            ));
        }

        match failure.context["op"].as_str() {
            Some("order_sync") => {
                let event: OrderEvent = serde_json::from_value(failure.context["event"].clone())
                    .map_err(|e| {
                        AppError::internal(format!("corrupt order_sync context: {e}"))
                    })?;
                // Idempotency gate inside makes the replay safe even when
                // the original submission landed after all
                self.replay_order(&connection, &event).await.map(|_| ())
            }
            Some("refund") => {
                let event: RefundEvent = serde_json::from_value(failure.context["event"].clone())
                    .map_err(|e| AppError::internal(format!("corrupt refund context: {e}")))?;
                self.replay_refund(&connection, &event).await.map(|_| ())
            }
            Some("stock_push") => {
                let sku = failure.context["sku"].as_str().ok_or_else(|| {
                    AppError::internal("corrupt stock_push context: missing sku")
                })?;
                let quantity = failure.context["quantity"].as_i64().ok_or_else(|| {
                    AppError::internal("corrupt stock_push context: missing quantity")
                })?;
                let platform = self.platforms.get(connection.platform)?;
                platform.set_stock_level(&connection, sku, quantity).await
            }
            other => Err(AppError::internal(format!(
                "no replay action for context op {other:?}"
            ))),
        }
    }
}

enum RecoveryOutcome {
    Recovered,
    Escalated,
    StillOpen,
}
