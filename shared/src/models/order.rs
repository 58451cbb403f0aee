//! Normalized order and refund events
//!
//! Platform adapters translate webhook payloads and polled orders into
//! these shapes before they reach the sync engine.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Payment state of an order, normalized across platforms
///
/// Each platform adapter defines its own mapping from the platform's
/// raw status strings into this shared enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Payment completed; the order is eligible for ledger mirroring
    Paid,
    /// Payment initiated but not settled
    Pending,
    /// Anything else (failed, on hold, draft, ...)
    Other,
}

/// One order line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// SKU as the storefront reports it; empty when the product has none
    #[serde(default)]
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Customer info carried on an order (counterparty for the ledger sale)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// A normalized storefront order event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub connection_id: String,
    /// Order ID as assigned by the storefront; unique per connection
    pub external_order_id: String,
    pub order_number: String,
    pub line_items: Vec<OrderLine>,
    pub total: Decimal,
    pub currency: String,
    pub payment_state: PaymentState,
    pub customer: Option<CustomerInfo>,
    /// Millis when the storefront created the order
    pub created_at: i64,
}

/// A refunded line within a partial refund
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundedLine {
    pub sku: String,
    /// Quantity taken from the refund payload, never recomputed
    pub quantity: i64,
    pub unit_price: Decimal,
}

/// Scope of a cancellation/refund event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RefundScope {
    /// The whole order was cancelled; original lines are carried in the event
    Full { lines: Vec<RefundedLine> },
    /// Only the listed lines were refunded
    Partial { lines: Vec<RefundedLine> },
}

/// A normalized cancellation or refund event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundEvent {
    pub connection_id: String,
    pub external_order_id: String,
    pub scope: RefundScope,
}

impl RefundEvent {
    /// Lines affected by this event, regardless of scope
    pub fn lines(&self) -> &[RefundedLine] {
        match &self.scope {
            RefundScope::Full { lines } | RefundScope::Partial { lines } => lines,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self.scope, RefundScope::Full { .. })
    }
}

/// A (sku, quantity) pair, used in compensation results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuQuantity {
    pub sku: String,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refund_event_lines() {
        let event = RefundEvent {
            connection_id: "c1".into(),
            external_order_id: "WC-500".into(),
            scope: RefundScope::Partial {
                lines: vec![RefundedLine {
                    sku: "ABC".into(),
                    quantity: 2,
                    unit_price: Decimal::new(1050, 2),
                }],
            },
        };
        assert_eq!(event.lines().len(), 1);
        assert!(!event.is_full());
    }

    #[test]
    fn test_refund_scope_serde_tagging() {
        let json = r#"{"type":"full","lines":[]}"#;
        let scope: RefundScope = serde_json::from_str(json).unwrap();
        assert!(matches!(scope, RefundScope::Full { .. }));
    }
}
