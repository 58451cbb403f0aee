//! The synchronization engine
//!
//! Mirrors storefront orders into the ledger exactly once, reconciles
//! ledger stock back into storefronts on a schedule, reverses ledger
//! effects for cancellations/refunds, and classifies/replays failures.
//!
//! Split by concern:
//! - [`orders`]: order sync processor (webhook + pull paths)
//! - [`compensation`]: cancellation/refund processor
//! - [`reconcile`]: scheduled inventory reconciliation
//! - [`recovery`]: failure classification, replay, escalation
//! - [`worker`]: background loops driving the above

pub mod compensation;
pub mod orders;
pub mod reconcile;
pub mod recovery;
pub mod worker;

pub use recovery::SweepSummary;
pub use worker::{ReconcileWorker, RecoveryWorker, WebhookJob, WebhookWorker};

use crate::db::Database;
use crate::db::repository::{
    ConnectionRepository, FailureFilter, FailureRepository, InventoryRepository,
    SalesLedgerRepository,
};
use crate::ledger::LedgerAdapter;
use crate::platform::PlatformRegistry;
use shared::error::AppResult;
use shared::models::{
    CompensationResult, Connection, OrderEvent, OrderOutcome, OrderPullSummary, RefundEvent,
    SyncFailure,
};
use std::sync::Arc;
use std::time::Duration;

/// The engine owning the persisted stores and the remote adapters.
///
/// Every operation takes the [`Connection`] it acts on as an explicit
/// parameter; there is no ambient "current connection".
#[derive(Clone)]
pub struct SyncEngine {
    pub(crate) connections: ConnectionRepository,
    pub(crate) sales: SalesLedgerRepository,
    pub(crate) inventory: InventoryRepository,
    pub(crate) failures: FailureRepository,
    pub(crate) ledger: Arc<dyn LedgerAdapter>,
    pub(crate) platforms: Arc<PlatformRegistry>,
    /// Ledger location pushed on sale/return documents
    pub(crate) ledger_location: Option<String>,
    /// Pause between successive write calls to the same platform
    pub(crate) write_gap: Duration,
}

impl SyncEngine {
    pub fn new(
        db: &Database,
        ledger: Arc<dyn LedgerAdapter>,
        platforms: Arc<PlatformRegistry>,
        ledger_location: Option<String>,
        write_gap: Duration,
    ) -> Self {
        Self {
            connections: ConnectionRepository::new(db.pool.clone()),
            sales: SalesLedgerRepository::new(db.pool.clone()),
            inventory: InventoryRepository::new(db.pool.clone()),
            failures: FailureRepository::new(db.pool.clone()),
            ledger,
            platforms,
            ledger_location,
            write_gap,
        }
    }

    pub fn connections(&self) -> &ConnectionRepository {
        &self.connections
    }

    // ===== Operations exposed to the route layer =====

    /// Process one normalized order event for a connection
    pub async fn process_order_event(
        &self,
        connection_id: &str,
        event: &OrderEvent,
    ) -> AppResult<OrderOutcome> {
        let connection = self.connections.require(connection_id).await?;
        self.process_order(&connection, event).await
    }

    /// Process one cancellation/refund event for a connection
    pub async fn process_refund_event(
        &self,
        connection_id: &str,
        event: &RefundEvent,
    ) -> AppResult<CompensationResult> {
        let connection = self.connections.require(connection_id).await?;
        self.process_refund(&connection, event).await
    }

    /// Fetch and process orders since the connection's last sync
    pub async fn pull_orders_for(&self, connection_id: &str) -> AppResult<OrderPullSummary> {
        let connection = self.connections.require(connection_id).await?;
        self.pull_orders(&connection).await
    }

    /// List recorded failures
    pub async fn list_failures(&self, filter: &FailureFilter) -> AppResult<Vec<SyncFailure>> {
        self.failures.list(filter).await
    }

    /// Manually resolve a failure (operator override)
    pub async fn resolve_failure(&self, id: i64) -> AppResult<SyncFailure> {
        self.failures.resolve_manual(id).await
    }

    /// Look up a connection and skip disabled ones
    pub(crate) fn connection_enabled(connection: &Connection) -> bool {
        if !connection.enabled {
            tracing::debug!(connection_id = %connection.id, "Connection disabled, skipping");
        }
        connection.enabled
    }
}
