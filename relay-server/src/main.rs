//! relay-server entry point

use relay_server::api;
use relay_server::core::{AppState, BackgroundTasks, Config};
use relay_server::sync::{ReconcileWorker, RecoveryWorker, WebhookWorker};
use std::time::Duration;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_server=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("Starting relay-server (env: {})", config.environment);

    let (state, webhook_rx) = AppState::new(&config).await?;

    // Background workers
    let mut tasks = BackgroundTasks::new();
    let shutdown = tasks.shutdown_token();

    let webhook_worker = WebhookWorker::new(state.engine.clone(), webhook_rx, shutdown.clone());
    tasks.spawn("webhook_worker", webhook_worker.run());

    let reconcile_worker = ReconcileWorker::new(
        state.engine.clone(),
        Duration::from_secs(config.reconcile_interval_secs),
        shutdown.clone(),
    );
    tasks.spawn("reconcile_worker", reconcile_worker.run());

    let recovery_worker = RecoveryWorker::new(
        state.engine.clone(),
        Duration::from_secs(config.recovery_interval_secs),
        shutdown.clone(),
    );
    tasks.spawn("recovery_worker", recovery_worker.run());

    // HTTP server
    let app = api::create_router(state);
    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("relay-server HTTP listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    // Drain background workers
    tasks.shutdown().await;

    Ok(())
}
