//! Server configuration

use shared::error::AppError;

/// Relay server configuration, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path
    pub database_path: String,
    /// HTTP API port
    pub http_port: u16,
    /// Base URL of the ledger API
    pub ledger_base_url: String,
    /// API key for the ledger
    pub ledger_api_key: String,
    /// Ledger location/warehouse the storefronts sell from
    pub ledger_location_id: Option<String>,
    /// Seconds between scheduled reconciliation passes
    pub reconcile_interval_secs: u64,
    /// Seconds between recovery sweeps
    pub recovery_interval_secs: u64,
    /// Per-request timeout for remote calls, seconds
    pub request_timeout_secs: u64,
    /// Pause between successive write calls to one platform, millis
    pub write_gap_ms: u64,
    /// Environment: development | staging | production
    pub environment: String,
}

impl Config {
    /// Require a secret env var outside development
    fn require_secret(name: &str, environment: &str) -> Result<String, AppError> {
        match std::env::var(name) {
            Ok(v) if !v.is_empty() => Ok(v),
            _ if environment == "development" => Ok(format!("dev-{name}")),
            _ => Err(AppError::config(format!(
                "{name} must be set in {environment} environment"
            ))),
        }
    }

    /// Load configuration from environment variables, with defaults
    pub fn from_env() -> Result<Self, AppError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_path: std::env::var("DATABASE_PATH").unwrap_or_else(|_| "relay.db".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8087),
            ledger_base_url: std::env::var("LEDGER_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9090".into()),
            ledger_api_key: Self::require_secret("LEDGER_API_KEY", &environment)?,
            ledger_location_id: std::env::var("LEDGER_LOCATION_ID")
                .ok()
                .filter(|s| !s.is_empty()),
            reconcile_interval_secs: std::env::var("RECONCILE_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(300),
            recovery_interval_secs: std::env::var("RECOVERY_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30),
            write_gap_ms: std::env::var("WRITE_GAP_MS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(250),
            environment,
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
