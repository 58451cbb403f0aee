//! Application state

use crate::core::config::Config;
use crate::db::Database;
use crate::ledger::LedgerClient;
use crate::platform::PlatformRegistry;
use crate::sync::{SyncEngine, WebhookJob};
use shared::error::AppError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: SyncEngine,
    /// Queue the webhook routes enqueue into; drained by the WebhookWorker
    pub webhook_tx: mpsc::UnboundedSender<WebhookJob>,
}

impl AppState {
    /// Build state from configuration. Returns the webhook queue's
    /// receiving end for the worker.
    pub async fn new(
        config: &Config,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WebhookJob>), AppError> {
        let db = Database::open(&config.database_path).await?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {e}")))?;

        let ledger = Arc::new(LedgerClient::new(
            client.clone(),
            config.ledger_base_url.clone(),
            config.ledger_api_key.clone(),
        ));
        let platforms = Arc::new(PlatformRegistry::with_defaults(client));

        let engine = SyncEngine::new(
            &db,
            ledger,
            platforms,
            config.ledger_location_id.clone(),
            Duration::from_millis(config.write_gap_ms),
        );

        let (webhook_tx, webhook_rx) = mpsc::unbounded_channel();

        Ok((
            Self {
                db,
                engine,
                webhook_tx,
            },
            webhook_rx,
        ))
    }
}
