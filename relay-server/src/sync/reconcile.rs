//! Inventory Reconciliation Poller
//!
//! Diffs the ledger's stock against the snapshot store and pushes only
//! changed quantities to each enabled storefront. The ledger is fetched
//! once per run and shared across connections; the snapshot tracks what
//! the ledger says, independent of whether a storefront push landed.

use super::SyncEngine;
use serde_json::json;
use shared::error::AppResult;
use shared::models::{
    Connection, FailureKind, LedgerProduct, ReconcileSummary, RunReport, StockRow,
};
use shared::util::now_millis;
use std::collections::HashMap;

impl SyncEngine {
    /// One reconciliation pass. `only_connection` narrows the run to a
    /// single connection (the manual trigger); the timer passes `None`.
    ///
    /// An unreachable ledger aborts the whole run: the snapshots stay
    /// the authoritative baseline and nothing stale is pushed.
    pub async fn run_reconciliation(&self, only_connection: Option<&str>) -> AppResult<RunReport> {
        let connections = match only_connection {
            Some(id) => vec![self.connections.require(id).await?],
            None => self.connections.find_enabled().await?,
        };
        if connections.is_empty() {
            return Ok(RunReport::default());
        }

        // One ledger fetch per run, shared across all connections
        let stock = self.ledger.list_stock(self.ledger_location.as_deref()).await?;
        let products = self.ledger.list_products().await?;
        let products_by_id: HashMap<&str, &LedgerProduct> =
            products.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut report = RunReport::default();
        for connection in &connections {
            if !Self::connection_enabled(connection) {
                continue;
            }
            let summary = self
                .reconcile_connection(connection, &stock, &products_by_id)
                .await;
            self.connections
                .set_last_synced(&connection.id, now_millis())
                .await?;
            report.connections.push(summary);
        }

        Ok(report)
    }

    async fn reconcile_connection(
        &self,
        connection: &Connection,
        stock: &[StockRow],
        products_by_id: &HashMap<&str, &LedgerProduct>,
    ) -> ReconcileSummary {
        let mut summary = ReconcileSummary {
            connection_id: connection.id.clone(),
            ..Default::default()
        };
        let platform = match self.platforms.get(connection.platform) {
            Ok(p) => p,
            Err(err) => {
                tracing::error!(
                    connection_id = %connection.id,
                    error = %err,
                    "No adapter for connection, skipping reconciliation"
                );
                return summary;
            }
        };

        let mut pushed_any = false;
        for row in stock {
            let Some(sku) = row.sku.as_deref().filter(|s| !s.is_empty()) else {
                continue;
            };
            let target = row.quantity.max(0);

            let snapshot = match self.inventory.get(&connection.id, sku).await {
                Ok(s) => s,
                Err(err) => {
                    tracing::error!(sku, error = %err, "Failed to load snapshot, skipping SKU");
                    summary.failed += 1;
                    continue;
                }
            };

            let first_sync = snapshot.is_none();
            match &snapshot {
                Some(s) if s.quantity == target => {
                    // Change-only propagation: no storefront call
                    summary.unchanged += 1;
                    continue;
                }
                _ => {}
            }

            // Respect platform write rate limits between successive pushes
            if pushed_any {
                tokio::time::sleep(self.write_gap).await;
            }
            pushed_any = true;

            let push_result = platform.set_stock_level(connection, sku, target).await;

            // The snapshot records what the ledger says either way; the
            // recovery path replays the push, not the diff
            let product = products_by_id.get(row.product_id.as_str());
            let upsert = self
                .inventory
                .upsert(
                    &connection.id,
                    sku,
                    &row.product_id,
                    product.map(|p| p.name.as_str()).unwrap_or(sku),
                    target,
                    product.map(|p| p.price).unwrap_or_default(),
                )
                .await;
            if let Err(err) = upsert {
                tracing::error!(sku, error = %err, "Failed to update snapshot");
            }

            match push_result {
                Ok(()) => {
                    if first_sync {
                        summary.created += 1;
                    }
                    summary.pushed += 1;
                }
                Err(err) => {
                    summary.failed += 1;
                    let context = json!({
                        "op": "stock_push",
                        "sku": sku,
                        "quantity": target,
                    });
                    self.record_failure(
                        &connection.id,
                        None,
                        &err,
                        FailureKind::InventorySyncError,
                        context,
                    )
                    .await;
                }
            }
        }

        tracing::info!(
            connection_id = %connection.id,
            pushed = summary.pushed,
            unchanged = summary.unchanged,
            created = summary.created,
            failed = summary.failed,
            "Reconciliation pass finished"
        );
        summary
    }
}
