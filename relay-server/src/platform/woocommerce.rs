//! WooCommerce adapter
//!
//! Talks to the WooCommerce REST API (`/wp-json/wc/v3`) with
//! consumer-key basic auth. Stock updates address products by SKU, so
//! each push is a lookup followed by an update.

use async_trait::async_trait;
use serde_json::{Value, json};
use shared::error::{AppError, AppResult};
use shared::models::{
    Connection, CustomerInfo, OrderEvent, OrderLine, PaymentState, PlatformKind, RefundEvent,
    RefundScope, RefundedLine, StorefrontProduct,
};

use super::{
    PlatformAdapter, RemoteSystem, decimal_field, error_for_response, str_field, timestamp_field,
    transport_error,
};

#[derive(Debug)]
pub struct WooAdapter {
    client: reqwest::Client,
}

impl WooAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn api_url(connection: &Connection, path: &str) -> String {
        format!(
            "{}/wp-json/wc/v3/{path}",
            connection.store_url.trim_end_matches('/')
        )
    }

    /// Resolve a Woo product id by SKU
    async fn find_product_id(&self, connection: &Connection, sku: &str) -> AppResult<i64> {
        let url = Self::api_url(connection, "products");
        let response = self
            .client
            .get(&url)
            .query(&[("sku", sku)])
            .basic_auth(&connection.credentials.key, Some(&connection.credentials.secret))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Storefront, response).await);
        }

        let products: Vec<Value> = response.json().await.map_err(transport_error)?;
        products
            .first()
            .and_then(|p| p["id"].as_i64())
            .ok_or_else(|| {
                AppError::remote(
                    shared::ErrorCode::NotFound,
                    404,
                    format!("storefront product with sku {sku} not found"),
                )
            })
    }

    fn parse_line(&self, item: &Value) -> OrderLine {
        OrderLine {
            sku: str_field(item, "sku"),
            name: str_field(item, "name"),
            quantity: item["quantity"].as_i64().unwrap_or(0),
            unit_price: decimal_field(item, "price"),
            line_total: decimal_field(item, "total"),
        }
    }
}

#[async_trait]
impl PlatformAdapter for WooAdapter {
    fn kind(&self) -> PlatformKind {
        PlatformKind::WooCommerce
    }

    fn map_payment_state(&self, raw: &str) -> PaymentState {
        match raw {
            "processing" | "completed" => PaymentState::Paid,
            "pending" | "on-hold" => PaymentState::Pending,
            _ => PaymentState::Other,
        }
    }

    fn parse_order_event(&self, connection: &Connection, payload: &Value) -> AppResult<OrderEvent> {
        let external_order_id = str_field(payload, "id");
        if external_order_id.is_empty() {
            return Err(AppError::validation("Woo order payload has no id"));
        }

        let line_items = payload["line_items"]
            .as_array()
            .map(|items| items.iter().map(|i| self.parse_line(i)).collect())
            .unwrap_or_default();

        let billing = &payload["billing"];
        let customer_name = format!(
            "{} {}",
            str_field(billing, "first_name"),
            str_field(billing, "last_name")
        )
        .trim()
        .to_string();
        let customer = (!customer_name.is_empty()).then(|| CustomerInfo {
            name: customer_name,
            email: billing["email"].as_str().map(String::from),
        });

        Ok(OrderEvent {
            connection_id: connection.id.clone(),
            external_order_id,
            order_number: str_field(payload, "number"),
            line_items,
            total: decimal_field(payload, "total"),
            currency: str_field(payload, "currency"),
            payment_state: self.map_payment_state(&str_field(payload, "status")),
            customer,
            created_at: timestamp_field(payload, "date_created_gmt"),
        })
    }

    fn parse_refund_event(
        &self,
        connection: &Connection,
        payload: &Value,
    ) -> AppResult<RefundEvent> {
        // A cancelled-order webhook delivers the full order payload;
        // a refund webhook delivers the refund object with order_id.
        if payload["status"].as_str() == Some("cancelled")
            || payload["status"].as_str() == Some("refunded")
        {
            let external_order_id = str_field(payload, "id");
            if external_order_id.is_empty() {
                return Err(AppError::validation("Woo cancellation payload has no id"));
            }
            let lines = payload["line_items"]
                .as_array()
                .map(|items| {
                    items
                        .iter()
                        .map(|i| RefundedLine {
                            sku: str_field(i, "sku"),
                            quantity: i["quantity"].as_i64().unwrap_or(0),
                            unit_price: decimal_field(i, "price"),
                        })
                        .collect()
                })
                .unwrap_or_default();
            return Ok(RefundEvent {
                connection_id: connection.id.clone(),
                external_order_id,
                scope: RefundScope::Full { lines },
            });
        }

        let external_order_id = str_field(payload, "order_id");
        if external_order_id.is_empty() {
            return Err(AppError::validation("Woo refund payload has no order_id"));
        }
        let lines = payload["line_items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|i| RefundedLine {
                        sku: str_field(i, "sku"),
                        // Woo reports refunded quantities as negatives
                        quantity: i["quantity"].as_i64().unwrap_or(0).abs(),
                        unit_price: decimal_field(i, "price"),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(RefundEvent {
            connection_id: connection.id.clone(),
            external_order_id,
            scope: RefundScope::Partial { lines },
        })
    }

    async fn fetch_orders(
        &self,
        connection: &Connection,
        since: Option<i64>,
    ) -> AppResult<Vec<OrderEvent>> {
        let url = Self::api_url(connection, "orders");
        let mut request = self
            .client
            .get(&url)
            .basic_auth(&connection.credentials.key, Some(&connection.credentials.secret))
            .query(&[("per_page", "100"), ("order", "asc"), ("orderby", "date")]);

        if let Some(since) = since {
            let after = chrono::DateTime::from_timestamp_millis(since)
                .unwrap_or_default()
                .to_rfc3339();
            request = request.query(&[("after", after.as_str())]);
        }

        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Storefront, response).await);
        }

        let payloads: Vec<Value> = response.json().await.map_err(transport_error)?;
        payloads
            .iter()
            .map(|p| self.parse_order_event(connection, p))
            .collect()
    }

    async fn set_stock_level(
        &self,
        connection: &Connection,
        sku: &str,
        quantity: i64,
    ) -> AppResult<()> {
        let product_id = self.find_product_id(connection, sku).await?;
        let url = Self::api_url(connection, &format!("products/{product_id}"));

        let response = self
            .client
            .put(&url)
            .basic_auth(&connection.credentials.key, Some(&connection.credentials.secret))
            .json(&json!({
                "manage_stock": true,
                "stock_quantity": quantity,
            }))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Storefront, response).await);
        }
        tracing::debug!(sku, quantity, "Woo stock updated");
        Ok(())
    }

    async fn create_or_update_product(
        &self,
        connection: &Connection,
        product: &StorefrontProduct,
    ) -> AppResult<()> {
        let body = json!({
            "name": product.name,
            "sku": product.sku,
            "regular_price": product.price.to_string(),
            "manage_stock": true,
            "stock_quantity": product.quantity,
        });

        // Update in place when the SKU already exists, create otherwise
        match self.find_product_id(connection, &product.sku).await {
            Ok(product_id) => {
                let url = Self::api_url(connection, &format!("products/{product_id}"));
                let response = self
                    .client
                    .put(&url)
                    .basic_auth(&connection.credentials.key, Some(&connection.credentials.secret))
                    .json(&body)
                    .send()
                    .await
                    .map_err(transport_error)?;
                if !response.status().is_success() {
                    return Err(error_for_response(RemoteSystem::Storefront, response).await);
                }
            }
            Err(err) if err.remote_status() == Some(404) => {
                let url = Self::api_url(connection, "products");
                let response = self
                    .client
                    .post(&url)
                    .basic_auth(&connection.credentials.key, Some(&connection.credentials.secret))
                    .json(&body)
                    .send()
                    .await
                    .map_err(transport_error)?;
                if !response.status().is_success() {
                    return Err(error_for_response(RemoteSystem::Storefront, response).await);
                }
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_connection() -> Connection {
        Connection {
            id: "c1".into(),
            platform: PlatformKind::WooCommerce,
            store_url: "https://shop.example.com".into(),
            credentials: shared::models::ApiCredentials {
                key: "ck_test".into(),
                secret: "cs_test".into(),
            },
            location_id: None,
            enabled: true,
            last_synced_at: None,
            created_at: 0,
        }
    }

    #[test]
    fn test_payment_state_mapping() {
        let adapter = WooAdapter::new(reqwest::Client::new());
        assert_eq!(adapter.map_payment_state("processing"), PaymentState::Paid);
        assert_eq!(adapter.map_payment_state("completed"), PaymentState::Paid);
        assert_eq!(adapter.map_payment_state("pending"), PaymentState::Pending);
        assert_eq!(adapter.map_payment_state("on-hold"), PaymentState::Pending);
        assert_eq!(adapter.map_payment_state("failed"), PaymentState::Other);
        assert_eq!(adapter.map_payment_state("cancelled"), PaymentState::Other);
    }

    #[test]
    fn test_parse_order_event() {
        let adapter = WooAdapter::new(reqwest::Client::new());
        let payload = serde_json::json!({
            "id": 500,
            "number": "500",
            "status": "processing",
            "total": "41.98",
            "currency": "EUR",
            "date_created_gmt": "2026-02-01T09:30:00Z",
            "billing": {"first_name": "Ana", "last_name": "García", "email": "ana@example.com"},
            "line_items": [
                {"sku": "ABC", "name": "Widget", "quantity": 2, "price": "10.99", "total": "21.98"},
                {"sku": "", "name": "Custom fee", "quantity": 1, "price": "20.00", "total": "20.00"}
            ]
        });

        let event = adapter.parse_order_event(&test_connection(), &payload).unwrap();
        assert_eq!(event.external_order_id, "500");
        assert_eq!(event.payment_state, PaymentState::Paid);
        assert_eq!(event.line_items.len(), 2);
        assert_eq!(event.line_items[0].sku, "ABC");
        assert_eq!(event.line_items[0].quantity, 2);
        assert!(event.line_items[1].sku.is_empty());
        assert_eq!(event.total.to_string(), "41.98");
        assert_eq!(event.customer.as_ref().unwrap().name, "Ana García");
    }

    #[test]
    fn test_parse_order_event_missing_id() {
        let adapter = WooAdapter::new(reqwest::Client::new());
        let payload = serde_json::json!({"status": "processing"});
        assert!(adapter.parse_order_event(&test_connection(), &payload).is_err());
    }

    #[test]
    fn test_parse_cancellation_as_full_refund() {
        let adapter = WooAdapter::new(reqwest::Client::new());
        let payload = serde_json::json!({
            "id": 500,
            "status": "cancelled",
            "line_items": [
                {"sku": "ABC", "quantity": 2, "price": "10.99"}
            ]
        });

        let event = adapter.parse_refund_event(&test_connection(), &payload).unwrap();
        assert!(event.is_full());
        assert_eq!(event.lines().len(), 1);
        assert_eq!(event.lines()[0].quantity, 2);
    }

    #[test]
    fn test_parse_partial_refund_uses_abs_quantity() {
        let adapter = WooAdapter::new(reqwest::Client::new());
        let payload = serde_json::json!({
            "order_id": 500,
            "amount": "10.99",
            "line_items": [
                {"sku": "ABC", "quantity": -1, "price": "10.99"}
            ]
        });

        let event = adapter.parse_refund_event(&test_connection(), &payload).unwrap();
        assert!(!event.is_full());
        assert_eq!(event.lines()[0].quantity, 1);
    }
}
