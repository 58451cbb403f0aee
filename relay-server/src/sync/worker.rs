//! Background workers driving the sync engine
//!
//! Three loops, each owning one entry point:
//! - [`WebhookWorker`] drains the queue the HTTP layer enqueues into,
//!   so webhook deliveries get their 200 before any downstream call
//! - [`ReconcileWorker`] fires the reconciliation pass on a fixed timer
//! - [`RecoveryWorker`] sweeps open failures on its own interval

use super::SyncEngine;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// A webhook delivery queued for asynchronous processing
#[derive(Debug)]
pub enum WebhookJob {
    Order { connection_id: String, payload: Value },
    Refund { connection_id: String, payload: Value },
}

pub struct WebhookWorker {
    engine: SyncEngine,
    rx: mpsc::UnboundedReceiver<WebhookJob>,
    shutdown: CancellationToken,
}

impl WebhookWorker {
    pub fn new(
        engine: SyncEngine,
        rx: mpsc::UnboundedReceiver<WebhookJob>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { engine, rx, shutdown }
    }

    pub async fn run(mut self) {
        tracing::info!("WebhookWorker started");
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    // Drain whatever is already queued before stopping
                    while let Ok(job) = self.rx.try_recv() {
                        self.handle(job).await;
                    }
                    break;
                }
                job = self.rx.recv() => {
                    match job {
                        Some(job) => self.handle(job).await,
                        None => break,
                    }
                }
            }
        }
        tracing::info!("WebhookWorker stopped");
    }

    async fn handle(&self, job: WebhookJob) {
        let result = match &job {
            WebhookJob::Order { connection_id, payload } => {
                self.process_order_payload(connection_id, payload).await
            }
            WebhookJob::Refund { connection_id, payload } => {
                self.process_refund_payload(connection_id, payload).await
            }
        };
        if let Err(err) = result {
            // Failures are already recorded inside the engine; this is
            // just the worker-level trace
            tracing::warn!(error = %err, "Webhook job failed");
        }
    }

    async fn process_order_payload(
        &self,
        connection_id: &str,
        payload: &Value,
    ) -> shared::AppResult<()> {
        let connection = self.engine.connections().require(connection_id).await?;
        let adapter = self.engine.platforms.get(connection.platform)?;
        let event = adapter.parse_order_event(&connection, payload)?;
        self.engine.process_order(&connection, &event).await?;
        Ok(())
    }

    async fn process_refund_payload(
        &self,
        connection_id: &str,
        payload: &Value,
    ) -> shared::AppResult<()> {
        let connection = self.engine.connections().require(connection_id).await?;
        let adapter = self.engine.platforms.get(connection.platform)?;
        let event = adapter.parse_refund_event(&connection, payload)?;
        self.engine.process_refund(&connection, &event).await?;
        Ok(())
    }
}

pub struct ReconcileWorker {
    engine: SyncEngine,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ReconcileWorker {
    pub fn new(engine: SyncEngine, interval: Duration, shutdown: CancellationToken) -> Self {
        Self { engine, interval, shutdown }
    }

    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "ReconcileWorker started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await; // skip the immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    match self.engine.run_reconciliation(None).await {
                        Ok(report) => {
                            tracing::debug!(
                                connections = report.connections.len(),
                                "Scheduled reconciliation finished"
                            );
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "Scheduled reconciliation failed");
                        }
                    }
                }
            }
        }
        tracing::info!("ReconcileWorker stopped");
    }
}

pub struct RecoveryWorker {
    engine: SyncEngine,
    interval: Duration,
    shutdown: CancellationToken,
}

impl RecoveryWorker {
    pub fn new(engine: SyncEngine, interval: Duration, shutdown: CancellationToken) -> Self {
        Self { engine, interval, shutdown }
    }

    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "RecoveryWorker started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(err) = self.engine.run_recovery_sweep().await {
                        tracing::error!(error = %err, "Recovery sweep failed");
                    }
                }
            }
        }
        tracing::info!("RecoveryWorker stopped");
    }
}
