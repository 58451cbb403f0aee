//! Storefront platform adapters
//!
//! Each adapter translates between the engine's normalized model and one
//! platform's REST API. Normalization happens here and only here: the
//! sync engine never branches on platform kind.

pub mod shopify;
pub mod woocommerce;

pub use shopify::ShopifyAdapter;
pub use woocommerce::WooAdapter;

use async_trait::async_trait;
use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Connection, OrderEvent, PaymentState, PlatformKind, RefundEvent, StorefrontProduct};
use std::collections::HashMap;
use std::sync::Arc;

/// Engine-facing contract for one storefront platform
#[async_trait]
pub trait PlatformAdapter: Send + Sync + std::fmt::Debug {
    fn kind(&self) -> PlatformKind;

    /// Map the platform's raw payment/status string into the shared enum
    fn map_payment_state(&self, raw: &str) -> PaymentState;

    /// Normalize an order webhook payload
    fn parse_order_event(&self, connection: &Connection, payload: &Value) -> AppResult<OrderEvent>;

    /// Normalize a cancellation/refund webhook payload
    fn parse_refund_event(&self, connection: &Connection, payload: &Value)
    -> AppResult<RefundEvent>;

    /// Fetch orders updated since `since` (millis), newest last
    async fn fetch_orders(
        &self,
        connection: &Connection,
        since: Option<i64>,
    ) -> AppResult<Vec<OrderEvent>>;

    /// Push a stock quantity for one SKU
    async fn set_stock_level(
        &self,
        connection: &Connection,
        sku: &str,
        quantity: i64,
    ) -> AppResult<()>;

    /// Create or update a product on the storefront
    async fn create_or_update_product(
        &self,
        connection: &Connection,
        product: &StorefrontProduct,
    ) -> AppResult<()>;
}

/// Registry of configured platform adapters
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    adapters: HashMap<PlatformKind, Arc<dyn PlatformAdapter>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in adapters over a shared HTTP client
    pub fn with_defaults(client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(WooAdapter::new(client.clone())));
        registry.register(Arc::new(ShopifyAdapter::new(client)));
        registry
    }

    pub fn register(&mut self, adapter: Arc<dyn PlatformAdapter>) {
        self.adapters.insert(adapter.kind(), adapter);
    }

    pub fn get(&self, kind: PlatformKind) -> AppResult<Arc<dyn PlatformAdapter>> {
        self.adapters.get(&kind).cloned().ok_or_else(|| {
            AppError::with_message(
                ErrorCode::PlatformNotSupported,
                format!("No adapter registered for platform {kind}"),
            )
        })
    }
}

// ===== Shared helpers for remote HTTP calls =====

/// Which remote system a call targeted, for error attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteSystem {
    Ledger,
    Storefront,
}

/// Map a reqwest transport error: timeouts surface as `TimeoutError`
/// so the recovery engine classifies them as `NetworkTimeout`.
pub fn transport_error(err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        AppError::timeout(format!("request timed out: {err}"))
    } else {
        AppError::network(format!("request failed: {err}"))
    }
}

/// Turn a non-success response into an [`AppError`], preserving the
/// remote status for failure classification.
pub async fn error_for_response(system: RemoteSystem, response: reqwest::Response) -> AppError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();

    let code = match status {
        401 => ErrorCode::InvalidCredentials,
        403 => ErrorCode::PermissionDenied,
        404 => ErrorCode::NotFound,
        429 => ErrorCode::RateLimited,
        _ => match system {
            RemoteSystem::Ledger => ErrorCode::LedgerRejected,
            RemoteSystem::Storefront => ErrorCode::StorefrontRejected,
        },
    };

    let label = match system {
        RemoteSystem::Ledger => "ledger",
        RemoteSystem::Storefront => "storefront",
    };
    AppError::remote(code, status, format!("{label} returned {status}: {snippet}"))
}

// ===== Parsing helpers for webhook payloads =====

pub(crate) fn str_field(value: &Value, key: &str) -> String {
    match &value[key] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

pub(crate) fn decimal_field(value: &Value, key: &str) -> rust_decimal::Decimal {
    match &value[key] {
        Value::String(s) => s.parse().unwrap_or_default(),
        Value::Number(n) => n.to_string().parse().unwrap_or_default(),
        _ => rust_decimal::Decimal::ZERO,
    }
}

/// Parse an RFC 3339 timestamp field into millis, defaulting to now
pub(crate) fn timestamp_field(value: &Value, key: &str) -> i64 {
    value[key]
        .as_str()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(shared::util::now_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_unknown_platform() {
        let registry = PlatformRegistry::new();
        let err = registry.get(PlatformKind::Shopify).unwrap_err();
        assert_eq!(err.code, ErrorCode::PlatformNotSupported);
    }

    #[test]
    fn test_str_field_accepts_numbers() {
        let v = serde_json::json!({"id": 12345, "number": "1001"});
        assert_eq!(str_field(&v, "id"), "12345");
        assert_eq!(str_field(&v, "number"), "1001");
        assert_eq!(str_field(&v, "missing"), "");
    }

    #[test]
    fn test_decimal_field() {
        let v = serde_json::json!({"total": "19.99", "price": 5.5});
        assert_eq!(decimal_field(&v, "total").to_string(), "19.99");
        assert_eq!(decimal_field(&v, "price").to_string(), "5.5");
        assert_eq!(decimal_field(&v, "missing"), rust_decimal::Decimal::ZERO);
    }

    #[test]
    fn test_timestamp_field() {
        let v = serde_json::json!({"created": "2026-01-10T12:00:00Z"});
        assert_eq!(timestamp_field(&v, "created"), 1_768_046_400_000);
    }
}
