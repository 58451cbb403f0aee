//! Sync failure taxonomy, retry policies, and run summaries

use super::order::SkuQuantity;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Classification of a failed sync operation
///
/// Each kind carries a fixed retry policy; the recovery engine never
/// re-classifies a persisted failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NetworkTimeout,
    RateLimit,
    AuthError,
    ProductNotFound,
    /// No line item of an order could be mapped to a ledger product.
    /// Not retryable: retrying cannot invent a mapping.
    MappingFailed,
    InventorySyncError,
    OrderProcessingError,
    RefundFailed,
    CancellationFailed,
    Unknown,
}

/// Retry policy for one failure kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Sleep after each failed attempt, in order
    pub backoff_ms: &'static [u64],
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network_timeout",
            Self::RateLimit => "rate_limit",
            Self::AuthError => "auth_error",
            Self::ProductNotFound => "product_not_found",
            Self::MappingFailed => "mapping_failed",
            Self::InventorySyncError => "inventory_sync_error",
            Self::OrderProcessingError => "order_processing_error",
            Self::RefundFailed => "refund_failed",
            Self::CancellationFailed => "cancellation_failed",
            Self::Unknown => "unknown",
        }
    }

    /// The fixed category → retry policy table
    pub fn policy(&self) -> RetryPolicy {
        match self {
            Self::NetworkTimeout => RetryPolicy {
                max_attempts: 3,
                backoff_ms: &[1_000, 2_000, 4_000],
            },
            Self::RateLimit => RetryPolicy {
                max_attempts: 5,
                backoff_ms: &[5_000, 10_000, 20_000, 40_000, 60_000],
            },
            Self::AuthError => RetryPolicy {
                max_attempts: 2,
                backoff_ms: &[1_000, 5_000],
            },
            Self::ProductNotFound => RetryPolicy {
                max_attempts: 1,
                backoff_ms: &[2_000],
            },
            Self::InventorySyncError => RetryPolicy {
                max_attempts: 3,
                backoff_ms: &[2_000, 5_000, 10_000],
            },
            Self::OrderProcessingError => RetryPolicy {
                max_attempts: 2,
                backoff_ms: &[5_000, 15_000],
            },
            Self::RefundFailed | Self::CancellationFailed => RetryPolicy {
                max_attempts: 2,
                backoff_ms: &[5_000, 15_000],
            },
            Self::MappingFailed | Self::Unknown => RetryPolicy {
                max_attempts: 0,
                backoff_ms: &[],
            },
        }
    }

    /// Whether the recovery engine should replay this kind at all
    pub fn is_retryable(&self) -> bool {
        self.policy().max_attempts > 0
    }

    /// Classify a transport-level failure from the remote status and
    /// message. Returns `None` when nothing matches; callers fall back
    /// to their own processor tag.
    pub fn classify(status: Option<u16>, message: &str) -> Option<Self> {
        let msg = message.to_ascii_lowercase();
        if msg.contains("timeout") || msg.contains("timed out") || msg.contains("connection reset")
        {
            return Some(Self::NetworkTimeout);
        }
        match status {
            Some(429) => return Some(Self::RateLimit),
            Some(401) => return Some(Self::AuthError),
            Some(404) if msg.contains("sku") || msg.contains("product") => {
                return Some(Self::ProductNotFound);
            }
            _ => {}
        }
        if msg.contains("too many requests") {
            Some(Self::RateLimit)
        } else if msg.contains("unauthorized") {
            Some(Self::AuthError)
        } else if msg.contains("sku not found") {
            Some(Self::ProductNotFound)
        } else {
            None
        }
    }

    /// Classify an [`AppError`], falling back to the given processor tag
    pub fn classify_or(err: &AppError, fallback: Self) -> Self {
        Self::classify(err.remote_status(), &err.message).unwrap_or(fallback)
    }

    /// Human-readable next step shown with an escalated failure
    pub fn manual_intervention_hint(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check connectivity to the remote system and re-run the sync",
            Self::RateLimit => "Wait out the rate limit window before re-running the sync",
            Self::AuthError => "Re-authenticate the connection (credentials may be revoked)",
            Self::ProductNotFound | Self::MappingFailed => {
                "Verify the SKU mapping between the storefront and the ledger"
            }
            Self::InventorySyncError => "Verify the storefront accepts stock updates for this SKU",
            Self::OrderProcessingError => "Inspect the order payload and re-run the order sync",
            Self::RefundFailed | Self::CancellationFailed => {
                "Verify the ledger return was not partially recorded before re-running"
            }
            Self::Unknown => "Inspect the error context; the cause could not be classified",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FailureKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "network_timeout" => Ok(Self::NetworkTimeout),
            "rate_limit" => Ok(Self::RateLimit),
            "auth_error" => Ok(Self::AuthError),
            "product_not_found" => Ok(Self::ProductNotFound),
            "mapping_failed" => Ok(Self::MappingFailed),
            "inventory_sync_error" => Ok(Self::InventorySyncError),
            "order_processing_error" => Ok(Self::OrderProcessingError),
            "refund_failed" => Ok(Self::RefundFailed),
            "cancellation_failed" => Ok(Self::CancellationFailed),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown failure kind: {other}")),
        }
    }
}

/// Whether a failure message indicates a cause no retry can fix
///
/// Matches the non-recoverable classes: invalid credentials, permission
/// denied, store not found.
pub fn requires_manual_cause(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    msg.contains("invalid credentials")
        || msg.contains("invalid api credentials")
        || msg.contains("permission denied")
        || msg.contains("store not found")
}

/// A recorded, possibly-recovering sync error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncFailure {
    pub id: i64,
    pub connection_id: String,
    /// External order id when the failure is order-scoped
    pub order_id: Option<String>,
    pub kind: FailureKind,
    pub message: String,
    /// Structured replay context (built request, sku, target quantity, ...)
    pub context: Value,
    /// Recovery attempts so far; only ever increases
    pub attempts: i64,
    pub resolved: bool,
    pub resolved_at: Option<i64>,
    /// True when the recovery engine resolved it without manual help
    pub auto_recovered: bool,
    /// True when retries are exhausted and the cause needs a human
    pub requires_manual: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Outcome of processing one order event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderOutcome {
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<SkipReason>,
}

impl OrderOutcome {
    pub fn processed() -> Self {
        Self {
            processed: true,
            reason: None,
        }
    }

    pub fn skipped(reason: SkipReason) -> Self {
        Self {
            processed: false,
            reason: Some(reason),
        }
    }
}

/// Why an order event was skipped (none of these are errors)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Payment not in a completed state
    NotPaid,
    /// A sales ledger entry already exists for this order
    AlreadyMirrored,
    /// The connection is disabled
    Disabled,
}

/// Result of a compensation (cancel/refund) run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationResult {
    /// Per-SKU quantities restored to the snapshots and storefront
    pub restored: Vec<SkuQuantity>,
}

/// Per-connection result of one reconciliation pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileSummary {
    pub connection_id: String,
    /// SKUs whose quantity was pushed to the storefront
    pub pushed: u32,
    /// SKUs whose snapshot already matched the ledger
    pub unchanged: u32,
    /// SKUs seen for the first time (snapshot created)
    pub created: u32,
    /// Storefront pushes that failed and were recorded for recovery
    pub failed: u32,
}

/// Result of a reconciliation run across connections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub connections: Vec<ReconcileSummary>,
}

/// Result of an order-pull batch for one connection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPullSummary {
    pub fetched: u32,
    pub processed: u32,
    pub skipped: u32,
    pub failed: u32,
}
