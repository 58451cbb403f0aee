//! Compensation processor: cancellations and refunds

mod common;

use common::*;
use rust_decimal::Decimal;
use shared::models::{FailureKind, PaymentState, RefundEvent, RefundScope, RefundedLine};

fn refunded_line(sku: &str, quantity: i64, unit_price: &str) -> RefundedLine {
    RefundedLine {
        sku: sku.into(),
        quantity,
        unit_price: unit_price.parse::<Decimal>().unwrap(),
    }
}

fn full_cancellation(connection_id: &str, order_id: &str, lines: Vec<RefundedLine>) -> RefundEvent {
    RefundEvent {
        connection_id: connection_id.into(),
        external_order_id: order_id.into(),
        scope: RefundScope::Full { lines },
    }
}

fn partial_refund(connection_id: &str, order_id: &str, lines: Vec<RefundedLine>) -> RefundEvent {
    RefundEvent {
        connection_id: connection_id.into(),
        external_order_id: order_id.into(),
        scope: RefundScope::Partial { lines },
    }
}

/// Mirror an order and seed snapshots so compensation has a baseline
async fn mirror_order(ctx: &TestContext, conn: &shared::models::Connection) {
    ctx.ledger.set_products(vec![
        ledger_product("p1", "ABC", "10.99"),
        ledger_product("p2", "XYZ", "4.50"),
    ]);
    ctx.ledger.set_stock(vec![stock_row("p1", "ABC", 3), stock_row("p2", "XYZ", 8)]);

    let event = order_event(
        &conn.id,
        "WC-900",
        vec![order_line("ABC", 2, "10.99"), order_line("XYZ", 1, "4.50")],
        PaymentState::Paid,
    );
    ctx.engine.process_order(conn, &event).await.unwrap();
    ctx.engine.run_reconciliation(None).await.unwrap();
}

#[tokio::test]
async fn cancelling_an_unmirrored_order_is_a_no_op() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    ctx.ledger.set_products(vec![ledger_product("p1", "ABC", "10.99")]);

    let event = full_cancellation(&conn.id, "WC-999", vec![refunded_line("ABC", 2, "10.99")]);
    let result = ctx.engine.process_refund(&conn, &event).await.unwrap();

    assert!(result.restored.is_empty());
    assert_eq!(ctx.ledger.return_count(), 0);
}

#[tokio::test]
async fn full_cancellation_restores_each_line_exactly() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    mirror_order(&ctx, &conn).await;
    let pushes_before = ctx.platform.pushes().len();

    let event = full_cancellation(
        &conn.id,
        "WC-900",
        vec![refunded_line("ABC", 2, "10.99"), refunded_line("XYZ", 1, "4.50")],
    );
    let result = ctx.engine.process_refund(&conn, &event).await.unwrap();

    // One ledger return covering both lines
    assert_eq!(ctx.ledger.return_count(), 1);
    let ret = &ctx.ledger.returns.lock().unwrap()[0];
    assert_eq!(ret.lines.len(), 2);
    assert_eq!(ret.external_ref, "woocommerce-WC-900-return");

    // Each SKU restored by exactly its original quantity
    assert_eq!(result.restored.len(), 2);
    assert_eq!(snapshot_quantity(&ctx, &conn.id, "ABC").await, Some(5));
    assert_eq!(snapshot_quantity(&ctx, &conn.id, "XYZ").await, Some(9));

    // Corrected quantities pushed to the storefront
    let pushes = ctx.platform.pushes();
    assert_eq!(pushes.len(), pushes_before + 2);
    assert!(pushes.contains(&("ABC".to_string(), 5)));
    assert!(pushes.contains(&("XYZ".to_string(), 9)));
}

#[tokio::test]
async fn partial_refund_restores_only_the_refunded_lines() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    mirror_order(&ctx, &conn).await;

    // Refund one unit of ABC only; quantity comes from the payload
    let event = partial_refund(&conn.id, "WC-900", vec![refunded_line("ABC", 1, "10.99")]);
    let result = ctx.engine.process_refund(&conn, &event).await.unwrap();

    assert_eq!(result.restored.len(), 1);
    assert_eq!(result.restored[0].sku, "ABC");
    assert_eq!(result.restored[0].quantity, 1);

    assert_eq!(snapshot_quantity(&ctx, &conn.id, "ABC").await, Some(4));
    // Untouched line keeps its reconciled quantity
    assert_eq!(snapshot_quantity(&ctx, &conn.id, "XYZ").await, Some(8));
}

#[tokio::test]
async fn ledger_return_failure_blocks_restoration() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    mirror_order(&ctx, &conn).await;
    let pushes_before = ctx.platform.pushes().len();

    ctx.ledger.fail_next_returns(10, "document rejected");
    let event = partial_refund(&conn.id, "WC-900", vec![refunded_line("ABC", 1, "10.99")]);
    ctx.engine.process_refund(&conn, &event).await.unwrap_err();

    // No restoration happened: a refund that never reached the ledger
    // must not inflate local stock
    assert_eq!(snapshot_quantity(&ctx, &conn.id, "ABC").await, Some(3));
    assert_eq!(ctx.platform.pushes().len(), pushes_before);

    let failures = ctx.engine.list_failures(&Default::default()).await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, FailureKind::RefundFailed);
    assert_eq!(failures[0].context["op"], "refund");
}

#[tokio::test]
async fn full_cancellation_failure_is_classified_separately() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    mirror_order(&ctx, &conn).await;

    ctx.ledger.fail_next_returns(10, "document rejected");
    let event = full_cancellation(&conn.id, "WC-900", vec![refunded_line("ABC", 2, "10.99")]);
    ctx.engine.process_refund(&conn, &event).await.unwrap_err();

    let failures = ctx.engine.list_failures(&Default::default()).await.unwrap();
    assert_eq!(failures[0].kind, FailureKind::CancellationFailed);
}

#[tokio::test]
async fn refund_with_no_lines_reverses_nothing() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    mirror_order(&ctx, &conn).await;

    let event = partial_refund(&conn.id, "WC-900", vec![]);
    let result = ctx.engine.process_refund(&conn, &event).await.unwrap();
    assert!(result.restored.is_empty());
    assert_eq!(ctx.ledger.return_count(), 0);
}

#[tokio::test]
async fn restoration_seeds_a_snapshot_when_none_exists() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    ctx.ledger.set_products(vec![ledger_product("p1", "ABC", "10.99")]);

    // Mirror without ever reconciling: no snapshot exists yet
    let event = order_event(&conn.id, "WC-901", vec![order_line("ABC", 2, "10.99")], PaymentState::Paid);
    ctx.engine.process_order(&conn, &event).await.unwrap();
    assert_eq!(snapshot_quantity(&ctx, &conn.id, "ABC").await, None);

    let refund = full_cancellation(&conn.id, "WC-901", vec![refunded_line("ABC", 2, "10.99")]);
    ctx.engine.process_refund(&conn, &refund).await.unwrap();

    // Seeded with the restored amount; the next reconciliation corrects it
    assert_eq!(snapshot_quantity(&ctx, &conn.id, "ABC").await, Some(2));
}
