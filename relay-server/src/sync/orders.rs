//! Order Sync Processor
//!
//! Turns a normalized storefront order event into exactly one ledger
//! sale. The sequence is fixed: payment gate, idempotency gate, SKU
//! mapping, ledger submission, sales-ledger row. The unique index on
//! (connection_id, external_order_id) is the real lock; an insert-time
//! violation is the expected signal of a racing duplicate delivery.

use super::SyncEngine;
use crate::db::repository::{InsertOutcome, NewSalesLedgerEntry};
use crate::ledger::{SaleLine, SaleRequest};
use serde_json::json;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Connection, FailureKind, OrderEvent, OrderOutcome, OrderPullSummary, PaymentState, SkipReason,
};
use shared::util::now_millis;

impl SyncEngine {
    /// Process one order event, recording failures for recovery
    pub async fn process_order(
        &self,
        connection: &Connection,
        event: &OrderEvent,
    ) -> AppResult<OrderOutcome> {
        self.run_order_sync(connection, event, true).await
    }

    /// Replay path used by the recovery engine: identical semantics,
    /// but does not record a fresh failure on top of the existing one
    pub(crate) async fn replay_order(
        &self,
        connection: &Connection,
        event: &OrderEvent,
    ) -> AppResult<OrderOutcome> {
        self.run_order_sync(connection, event, false).await
    }

    async fn run_order_sync(
        &self,
        connection: &Connection,
        event: &OrderEvent,
        record_failures: bool,
    ) -> AppResult<OrderOutcome> {
        if !Self::connection_enabled(connection) {
            return Ok(OrderOutcome::skipped(SkipReason::Disabled));
        }

        // Payment gate: anything not settled is a no-op, not an error
        if event.payment_state != PaymentState::Paid {
            tracing::debug!(
                connection_id = %connection.id,
                order_id = %event.external_order_id,
                state = ?event.payment_state,
                "Order not paid, skipping"
            );
            return Ok(OrderOutcome::skipped(SkipReason::NotPaid));
        }

        // Idempotency gate: one sales ledger row per order, ever
        if self
            .sales
            .find_by_order(&connection.id, &event.external_order_id)
            .await?
            .is_some()
        {
            tracing::debug!(
                connection_id = %connection.id,
                order_id = %event.external_order_id,
                "Order already mirrored, skipping"
            );
            return Ok(OrderOutcome::skipped(SkipReason::AlreadyMirrored));
        }

        match self.mirror_order(connection, event).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                if record_failures {
                    self.record_order_failure(connection, event, &err).await;
                }
                Err(err)
            }
        }
    }

    /// Map line items and submit the ledger sale
    async fn mirror_order(
        &self,
        connection: &Connection,
        event: &OrderEvent,
    ) -> AppResult<OrderOutcome> {
        let mut lines = Vec::new();
        for item in &event.line_items {
            if item.sku.is_empty() {
                tracing::warn!(
                    order_id = %event.external_order_id,
                    item = %item.name,
                    "Dropping line item without SKU"
                );
                continue;
            }
            match self.ledger.find_product_by_sku(&item.sku).await? {
                Some(product) => lines.push(SaleLine {
                    product_id: product.id,
                    sku: item.sku.clone(),
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                }),
                None => {
                    tracing::warn!(
                        order_id = %event.external_order_id,
                        sku = %item.sku,
                        "Dropping line item with unmapped SKU"
                    );
                }
            }
        }

        if lines.is_empty() {
            return Err(AppError::with_message(
                ErrorCode::SkuUnmapped,
                format!(
                    "no line item of order {} could be mapped to a ledger product",
                    event.external_order_id
                ),
            ));
        }

        let request = SaleRequest {
            external_ref: format!("{}-{}", connection.platform, event.external_order_id),
            location_id: self.ledger_location.clone(),
            counterparty: event.customer.as_ref().map(|c| c.name.clone()),
            currency: event.currency.clone(),
            lines,
            payment_method: "storefront".to_string(),
            total: event.total,
        };

        let result = self.ledger.record_sale(&request).await?;

        let outcome = self
            .sales
            .insert(NewSalesLedgerEntry {
                connection_id: connection.id.clone(),
                external_order_id: event.external_order_id.clone(),
                order_number: event.order_number.clone(),
                total: event.total,
                currency: event.currency.clone(),
                status: "mirrored".to_string(),
                ordered_at: event.created_at,
                ledger_txn_id: Some(result.transaction_id.clone()),
            })
            .await?;

        match outcome {
            InsertOutcome::Inserted(_) => {
                tracing::info!(
                    connection_id = %connection.id,
                    order_id = %event.external_order_id,
                    txn_id = %result.transaction_id,
                    "Order mirrored into ledger"
                );
                Ok(OrderOutcome::processed())
            }
            InsertOutcome::Duplicate => {
                // A concurrent delivery won the insert race. The ledger
                // dedupes on external_ref, so the second sale collapses
                // remotely as well.
                tracing::warn!(
                    connection_id = %connection.id,
                    order_id = %event.external_order_id,
                    "Lost idempotency race, order already mirrored"
                );
                Ok(OrderOutcome::skipped(SkipReason::AlreadyMirrored))
            }
        }
    }

    async fn record_order_failure(
        &self,
        connection: &Connection,
        event: &OrderEvent,
        err: &AppError,
    ) {
        let fallback = if err.code == ErrorCode::SkuUnmapped {
            FailureKind::MappingFailed
        } else {
            FailureKind::OrderProcessingError
        };
        let context = json!({
            "op": "order_sync",
            "event": event,
        });
        self.record_failure(
            &connection.id,
            Some(&event.external_order_id),
            err,
            fallback,
            context,
        )
        .await;
    }

    /// Fetch orders updated since the last sync and process each one.
    /// Per-order failures never abort the batch; the connection's
    /// last-sync timestamp advances once the batch finishes.
    pub async fn pull_orders(&self, connection: &Connection) -> AppResult<OrderPullSummary> {
        if !Self::connection_enabled(connection) {
            return Ok(OrderPullSummary::default());
        }

        let adapter = self.platforms.get(connection.platform)?;
        let events = adapter
            .fetch_orders(connection, connection.last_synced_at)
            .await?;

        let mut summary = OrderPullSummary {
            fetched: events.len() as u32,
            ..Default::default()
        };

        for event in &events {
            match self.process_order(connection, event).await {
                Ok(outcome) if outcome.processed => summary.processed += 1,
                Ok(_) => summary.skipped += 1,
                Err(err) => {
                    summary.failed += 1;
                    tracing::warn!(
                        connection_id = %connection.id,
                        order_id = %event.external_order_id,
                        error = %err,
                        "Order failed during pull, continuing batch"
                    );
                }
            }
        }

        self.connections
            .set_last_synced(&connection.id, now_millis())
            .await?;

        tracing::info!(
            connection_id = %connection.id,
            fetched = summary.fetched,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            "Order pull finished"
        );
        Ok(summary)
    }
}
