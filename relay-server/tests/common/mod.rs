//! Shared test fixtures: in-memory database, mock ledger and platform
//! adapters wired into a real engine.

// Each integration test binary compiles its own copy of this module and
// uses a different subset of the helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use relay_server::db::Database;
use relay_server::db::repository::NewConnection;
use relay_server::ledger::{
    LedgerAdapter, ReturnRequest, ReturnResult, SaleRequest, SaleResult,
};
use relay_server::platform::{PlatformAdapter, PlatformRegistry};
use relay_server::sync::SyncEngine;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Connection, CustomerInfo, LedgerProduct, OrderEvent, OrderLine, PaymentState, PlatformKind,
    RefundEvent, StockRow, StorefrontProduct,
};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Build the failure error used when a mock is told to fail: a message
/// mentioning a timeout classifies as NetworkTimeout downstream.
fn failure_error(message: &str) -> AppError {
    if message.contains("timed out") {
        AppError::timeout(message)
    } else {
        AppError::with_message(ErrorCode::LedgerRejected, message)
    }
}

#[derive(Default)]
pub struct MockLedger {
    pub products: Mutex<Vec<LedgerProduct>>,
    pub stock: Mutex<Vec<StockRow>>,
    pub sales: Mutex<Vec<SaleRequest>>,
    pub returns: Mutex<Vec<ReturnRequest>>,
    /// Number of record_sale calls that should fail before succeeding
    pub sale_failures: AtomicU32,
    /// Number of record_return calls that should fail before succeeding
    pub return_failures: AtomicU32,
    /// Number of list_stock calls that should fail (unreachable ledger)
    pub stock_failures: AtomicU32,
    pub fail_message: Mutex<String>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            fail_message: Mutex::new("request timed out".to_string()),
            ..Default::default()
        }
    }

    pub fn set_products(&self, products: Vec<LedgerProduct>) {
        *self.products.lock().unwrap() = products;
    }

    pub fn set_stock(&self, stock: Vec<StockRow>) {
        *self.stock.lock().unwrap() = stock;
    }

    pub fn fail_next_sales(&self, count: u32, message: &str) {
        self.sale_failures.store(count, Ordering::SeqCst);
        *self.fail_message.lock().unwrap() = message.to_string();
    }

    pub fn fail_next_returns(&self, count: u32, message: &str) {
        self.return_failures.store(count, Ordering::SeqCst);
        *self.fail_message.lock().unwrap() = message.to_string();
    }

    pub fn fail_next_stock_fetches(&self, count: u32, message: &str) {
        self.stock_failures.store(count, Ordering::SeqCst);
        *self.fail_message.lock().unwrap() = message.to_string();
    }

    pub fn sale_count(&self) -> usize {
        self.sales.lock().unwrap().len()
    }

    pub fn return_count(&self) -> usize {
        self.returns.lock().unwrap().len()
    }

    fn take_failure(&self, counter: &AtomicU32) -> Option<AppError> {
        let remaining = counter.load(Ordering::SeqCst);
        if remaining > 0 {
            counter.store(remaining - 1, Ordering::SeqCst);
            Some(failure_error(&self.fail_message.lock().unwrap()))
        } else {
            None
        }
    }
}

#[async_trait]
impl LedgerAdapter for MockLedger {
    async fn list_stock(&self, _location_id: Option<&str>) -> AppResult<Vec<StockRow>> {
        if let Some(err) = self.take_failure(&self.stock_failures) {
            return Err(err);
        }
        Ok(self.stock.lock().unwrap().clone())
    }

    async fn list_products(&self) -> AppResult<Vec<LedgerProduct>> {
        Ok(self.products.lock().unwrap().clone())
    }

    async fn find_product_by_sku(&self, sku: &str) -> AppResult<Option<LedgerProduct>> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.sku.as_deref() == Some(sku))
            .cloned())
    }

    async fn record_sale(&self, request: &SaleRequest) -> AppResult<SaleResult> {
        if let Some(err) = self.take_failure(&self.sale_failures) {
            return Err(err);
        }
        let mut sales = self.sales.lock().unwrap();
        sales.push(request.clone());
        Ok(SaleResult {
            transaction_id: format!("txn-{}", sales.len()),
        })
    }

    async fn record_return(&self, request: &ReturnRequest) -> AppResult<ReturnResult> {
        if let Some(err) = self.take_failure(&self.return_failures) {
            return Err(err);
        }
        let mut returns = self.returns.lock().unwrap();
        returns.push(request.clone());
        Ok(ReturnResult {
            transaction_id: format!("ret-{}", returns.len()),
        })
    }
}

#[derive(Debug, Default)]
pub struct MockPlatform {
    pub stock_calls: Mutex<Vec<(String, i64)>>,
    pub product_calls: Mutex<Vec<StorefrontProduct>>,
    pub orders: Mutex<Vec<OrderEvent>>,
    /// Number of set_stock_level calls that should fail
    pub push_failures: AtomicU32,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_orders(&self, orders: Vec<OrderEvent>) {
        *self.orders.lock().unwrap() = orders;
    }

    pub fn fail_next_pushes(&self, count: u32) {
        self.push_failures.store(count, Ordering::SeqCst);
    }

    pub fn pushes(&self) -> Vec<(String, i64)> {
        self.stock_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformAdapter for MockPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::WooCommerce
    }

    fn map_payment_state(&self, raw: &str) -> PaymentState {
        match raw {
            "paid" | "processing" | "completed" => PaymentState::Paid,
            "pending" => PaymentState::Pending,
            _ => PaymentState::Other,
        }
    }

    fn parse_order_event(
        &self,
        _connection: &Connection,
        payload: &Value,
    ) -> AppResult<OrderEvent> {
        serde_json::from_value(payload.clone())
            .map_err(|e| AppError::validation(format!("bad order payload: {e}")))
    }

    fn parse_refund_event(
        &self,
        _connection: &Connection,
        payload: &Value,
    ) -> AppResult<RefundEvent> {
        serde_json::from_value(payload.clone())
            .map_err(|e| AppError::validation(format!("bad refund payload: {e}")))
    }

    async fn fetch_orders(
        &self,
        _connection: &Connection,
        _since: Option<i64>,
    ) -> AppResult<Vec<OrderEvent>> {
        Ok(self.orders.lock().unwrap().clone())
    }

    async fn set_stock_level(
        &self,
        _connection: &Connection,
        sku: &str,
        quantity: i64,
    ) -> AppResult<()> {
        let remaining = self.push_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.push_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::with_message(
                ErrorCode::StorefrontRejected,
                "storefront returned 500: push rejected",
            ));
        }
        self.stock_calls
            .lock()
            .unwrap()
            .push((sku.to_string(), quantity));
        Ok(())
    }

    async fn create_or_update_product(
        &self,
        _connection: &Connection,
        product: &StorefrontProduct,
    ) -> AppResult<()> {
        self.product_calls.lock().unwrap().push(product.clone());
        Ok(())
    }
}

pub struct TestContext {
    pub db: Database,
    pub engine: SyncEngine,
    pub ledger: Arc<MockLedger>,
    pub platform: Arc<MockPlatform>,
}

/// Engine over an in-memory database with mock adapters
pub async fn setup() -> TestContext {
    let db = Database::in_memory().await.unwrap();
    let ledger = Arc::new(MockLedger::new());
    let platform = Arc::new(MockPlatform::new());

    let mut registry = PlatformRegistry::new();
    registry.register(platform.clone());

    let engine = SyncEngine::new(
        &db,
        ledger.clone(),
        Arc::new(registry),
        Some("loc-1".to_string()),
        Duration::from_millis(0),
    );

    TestContext {
        db,
        engine,
        ledger,
        platform,
    }
}

/// Register an enabled WooCommerce connection
pub async fn create_connection(ctx: &TestContext) -> Connection {
    ctx.engine
        .connections()
        .create(NewConnection {
            platform: PlatformKind::WooCommerce,
            store_url: "https://shop.example.com".into(),
            api_key: "ck_test".into(),
            api_secret: "cs_test".into(),
            location_id: Some("loc-1".into()),
        })
        .await
        .unwrap()
}

/// Load the sales ledger entry for one order, if any
pub async fn sales_entry(
    ctx: &TestContext,
    connection_id: &str,
    external_order_id: &str,
) -> Option<relay_server::db::models::SalesLedgerEntry> {
    relay_server::db::repository::SalesLedgerRepository::new(ctx.db.pool.clone())
        .find_by_order(connection_id, external_order_id)
        .await
        .unwrap()
}

/// Count sales ledger rows for a connection
pub async fn sales_count(ctx: &TestContext, connection_id: &str) -> i64 {
    relay_server::db::repository::SalesLedgerRepository::new(ctx.db.pool.clone())
        .count_for_connection(connection_id)
        .await
        .unwrap()
}

/// Load the snapshot quantity for one SKU, if any
pub async fn snapshot_quantity(
    ctx: &TestContext,
    connection_id: &str,
    sku: &str,
) -> Option<i64> {
    relay_server::db::repository::InventoryRepository::new(ctx.db.pool.clone())
        .get(connection_id, sku)
        .await
        .unwrap()
        .map(|s| s.quantity)
}

pub fn ledger_product(id: &str, sku: &str, price: &str) -> LedgerProduct {
    LedgerProduct {
        id: id.into(),
        name: format!("Product {id}"),
        sku: Some(sku.into()),
        variant_of: None,
        price: price.parse().unwrap(),
    }
}

pub fn stock_row(product_id: &str, sku: &str, quantity: i64) -> StockRow {
    StockRow {
        product_id: product_id.into(),
        sku: Some(sku.into()),
        quantity,
    }
}

pub fn order_line(sku: &str, quantity: i64, unit_price: &str) -> OrderLine {
    let unit: Decimal = unit_price.parse().unwrap();
    OrderLine {
        sku: sku.into(),
        name: format!("Item {sku}"),
        quantity,
        unit_price: unit,
        line_total: unit * Decimal::from(quantity),
    }
}

pub fn order_event(
    connection_id: &str,
    external_order_id: &str,
    lines: Vec<OrderLine>,
    payment_state: PaymentState,
) -> OrderEvent {
    let total = lines.iter().map(|l| l.line_total).sum();
    OrderEvent {
        connection_id: connection_id.into(),
        external_order_id: external_order_id.into(),
        order_number: external_order_id.into(),
        line_items: lines,
        total,
        currency: "EUR".into(),
        payment_state,
        customer: Some(CustomerInfo {
            name: "Test Customer".into(),
            email: Some("test@example.com".into()),
        }),
        created_at: shared::util::now_millis(),
    }
}
