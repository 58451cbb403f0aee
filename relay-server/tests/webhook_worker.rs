//! Webhook worker: queued deliveries are processed asynchronously

mod common;

use common::*;
use relay_server::sync::{WebhookJob, WebhookWorker};
use shared::models::PaymentState;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn queued_order_webhook_is_mirrored() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    ctx.ledger.set_products(vec![ledger_product("p1", "ABC", "10.99")]);

    let (tx, rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let worker = WebhookWorker::new(ctx.engine.clone(), rx, shutdown.clone());
    let handle = tokio::spawn(worker.run());

    // The mock adapter parses the normalized event shape directly
    let event = order_event(&conn.id, "WC-1000", vec![order_line("ABC", 1, "10.99")], PaymentState::Paid);
    tx.send(WebhookJob::Order {
        connection_id: conn.id.clone(),
        payload: serde_json::to_value(&event).unwrap(),
    })
    .unwrap();

    // Closing the queue lets the worker drain and exit
    drop(tx);
    handle.await.unwrap();

    assert_eq!(ctx.ledger.sale_count(), 1);
    assert_eq!(sales_count(&ctx, &conn.id).await, 1);
}

#[tokio::test]
async fn pending_jobs_are_drained_on_shutdown() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    ctx.ledger.set_products(vec![ledger_product("p1", "ABC", "10.99")]);

    let (tx, rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();

    // Enqueue before the worker even starts, then cancel immediately:
    // the drain-on-shutdown path must still process the job
    let event = order_event(&conn.id, "WC-1001", vec![order_line("ABC", 1, "10.99")], PaymentState::Paid);
    tx.send(WebhookJob::Order {
        connection_id: conn.id.clone(),
        payload: serde_json::to_value(&event).unwrap(),
    })
    .unwrap();
    shutdown.cancel();

    let worker = WebhookWorker::new(ctx.engine.clone(), rx, shutdown);
    worker.run().await;

    assert_eq!(sales_count(&ctx, &conn.id).await, 1);
}

#[tokio::test]
async fn bad_payload_does_not_kill_the_worker() {
    let ctx = setup().await;
    let conn = create_connection(&ctx).await;
    ctx.ledger.set_products(vec![ledger_product("p1", "ABC", "10.99")]);

    let (tx, rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    let worker = WebhookWorker::new(ctx.engine.clone(), rx, shutdown);
    let handle = tokio::spawn(worker.run());

    tx.send(WebhookJob::Order {
        connection_id: conn.id.clone(),
        payload: serde_json::json!({"not": "an order"}),
    })
    .unwrap();

    let event = order_event(&conn.id, "WC-1002", vec![order_line("ABC", 1, "10.99")], PaymentState::Paid);
    tx.send(WebhookJob::Order {
        connection_id: conn.id.clone(),
        payload: serde_json::to_value(&event).unwrap(),
    })
    .unwrap();

    drop(tx);
    handle.await.unwrap();

    // The malformed job was logged and skipped; the good one landed
    assert_eq!(sales_count(&ctx, &conn.id).await, 1);
}
