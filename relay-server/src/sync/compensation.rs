//! Compensation Processor
//!
//! Reverses the ledger and store-side effects of a previously mirrored
//! order. The ledger return goes first; snapshots and storefront stock
//! are only restored after the return succeeds, so a refund that never
//! reached the ledger cannot inflate local stock.

use super::SyncEngine;
use crate::ledger::{ReturnRequest, SaleLine};
use serde_json::json;
use shared::error::{AppError, AppResult};
use shared::models::{CompensationResult, Connection, FailureKind, RefundEvent, SkuQuantity};

impl SyncEngine {
    /// Process one cancellation/refund event, recording failures
    pub async fn process_refund(
        &self,
        connection: &Connection,
        event: &RefundEvent,
    ) -> AppResult<CompensationResult> {
        self.run_compensation(connection, event, true).await
    }

    /// Replay path for the recovery engine (no fresh failure records)
    pub(crate) async fn replay_refund(
        &self,
        connection: &Connection,
        event: &RefundEvent,
    ) -> AppResult<CompensationResult> {
        self.run_compensation(connection, event, false).await
    }

    async fn run_compensation(
        &self,
        connection: &Connection,
        event: &RefundEvent,
        record_failures: bool,
    ) -> AppResult<CompensationResult> {
        // Nothing was ever mirrored: reversing is a no-op
        let Some(entry) = self
            .sales
            .find_by_order(&connection.id, &event.external_order_id)
            .await?
        else {
            tracing::debug!(
                connection_id = %connection.id,
                order_id = %event.external_order_id,
                "Refund for an order that was never mirrored, nothing to do"
            );
            return Ok(CompensationResult { restored: vec![] });
        };

        let lines = event.lines();
        if lines.is_empty() {
            tracing::warn!(
                order_id = %event.external_order_id,
                "Refund event carried no lines, nothing to reverse"
            );
            return Ok(CompensationResult { restored: vec![] });
        }

        match self.reverse_order(connection, event).await {
            Ok(result) => Ok(result),
            Err(err) => {
                if record_failures {
                    let fallback = if event.is_full() {
                        FailureKind::CancellationFailed
                    } else {
                        FailureKind::RefundFailed
                    };
                    let context = json!({
                        "op": "refund",
                        "event": event,
                        "ledger_txn_id": entry.ledger_txn_id,
                    });
                    self.record_failure(
                        &connection.id,
                        Some(&event.external_order_id),
                        &err,
                        fallback,
                        context,
                    )
                    .await;
                }
                Err(err)
            }
        }
    }

    async fn reverse_order(
        &self,
        connection: &Connection,
        event: &RefundEvent,
    ) -> AppResult<CompensationResult> {
        // Resolve products for the refunded lines; quantities come from
        // the event payload, never recomputed from the ledger
        let mut return_lines = Vec::new();
        let mut resolved = Vec::new();
        for line in event.lines() {
            if line.sku.is_empty() || line.quantity <= 0 {
                continue;
            }
            match self.ledger.find_product_by_sku(&line.sku).await? {
                Some(product) => {
                    return_lines.push(SaleLine {
                        product_id: product.id.clone(),
                        sku: line.sku.clone(),
                        name: product.name.clone(),
                        quantity: line.quantity,
                        unit_price: line.unit_price,
                    });
                    resolved.push((line, product));
                }
                None => {
                    tracing::warn!(
                        order_id = %event.external_order_id,
                        sku = %line.sku,
                        "Dropping refund line with unmapped SKU"
                    );
                }
            }
        }

        if return_lines.is_empty() {
            return Err(AppError::with_message(
                shared::ErrorCode::SkuUnmapped,
                format!(
                    "no refunded line of order {} could be mapped to a ledger product",
                    event.external_order_id
                ),
            ));
        }

        let request = ReturnRequest {
            external_ref: format!(
                "{}-{}-return",
                connection.platform, event.external_order_id
            ),
            location_id: self.ledger_location.clone(),
            lines: return_lines,
        };
        let result = self.ledger.record_return(&request).await?;
        tracing::info!(
            connection_id = %connection.id,
            order_id = %event.external_order_id,
            txn_id = %result.transaction_id,
            full = event.is_full(),
            "Ledger return recorded"
        );

        // Ledger return succeeded: restore snapshots and push the
        // corrected quantities. A storefront push that fails is recorded
        // for recovery but does not undo the restoration.
        let platform = self.platforms.get(connection.platform)?;
        let mut restored = Vec::new();
        for (line, product) in resolved {
            let new_quantity = match self
                .inventory
                .adjust(&connection.id, &line.sku, line.quantity)
                .await?
            {
                Some(q) => q,
                None => {
                    // First sight of this SKU: seed a snapshot with the
                    // restored amount; the next reconciliation corrects it
                    self.inventory
                        .upsert(
                            &connection.id,
                            &line.sku,
                            &product.id,
                            &product.name,
                            line.quantity,
                            product.price,
                        )
                        .await?;
                    line.quantity
                }
            };

            if let Err(err) = platform
                .set_stock_level(connection, &line.sku, new_quantity)
                .await
            {
                let context = json!({
                    "op": "stock_push",
                    "sku": line.sku,
                    "quantity": new_quantity,
                });
                self.record_failure(
                    &connection.id,
                    Some(&event.external_order_id),
                    &err,
                    FailureKind::InventorySyncError,
                    context,
                )
                .await;
            }

            restored.push(SkuQuantity {
                sku: line.sku.clone(),
                quantity: line.quantity,
            });
        }

        Ok(CompensationResult { restored })
    }
}
