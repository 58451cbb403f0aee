//! Shopify adapter
//!
//! Talks to the Shopify Admin REST API with an access-token header.
//! Stock updates resolve the variant by SKU and write its inventory
//! quantity.

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

const API_VERSION: &str = "2024-01";

#[derive(Debug)]
pub struct ShopifyAdapter {
    client: reqwest::Client,
}

impl ShopifyAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn api_url(connection: &Connection, path: &str) -> String {
        format!(
            "{}/admin/api/{API_VERSION}/{path}",
            connection.store_url.trim_end_matches('/')
        )
    }

    /// Resolve a variant id by SKU
    async fn find_variant_id(&self, connection: &Connection, sku: &str) -> AppResult<i64> {
        let url = Self::api_url(connection, "variants.json");
        let response = self
            .client
            .get(&url)
            .query(&[("sku", sku)])
            .header("X-Shopify-Access-Token", &connection.credentials.key)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Storefront, response).await);
        }

        let body: Value = response.json().await.map_err(transport_error)?;
        body["variants"]
            .as_array()
            .and_then(|v| v.first())
            .and_then(|v| v["id"].as_i64())
            .ok_or_else(|| {
                AppError::remote(
                    shared::ErrorCode::NotFound,
                    404,
                    format!("storefront variant with sku {sku} not found"),
                )
            })
    }

    fn parse_line(&self, item: &Value) -> OrderLine {
        let quantity = item["quantity"].as_i64().unwrap_or(0);
        let unit_price = decimal_field(item, "price");
        OrderLine {
            sku: str_field(item, "sku"),
            name: str_field(item, "title"),
            quantity,
            unit_price,
            line_total: unit_price * rust_decimal::Decimal::from(quantity),
        }
    }
}

#[async_trait]
impl PlatformAdapter for ShopifyAdapter {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Shopify
    }

    fn map_payment_state(&self, raw: &str) -> PaymentState {
        match raw {
            "paid" | "partially_refunded" => PaymentState::Paid,
            "pending" | "authorized" => PaymentState::Pending,
            _ => PaymentState::Other,
        }
    }

    fn parse_order_event(&self, connection: &Connection, payload: &Value) -> AppResult<OrderEvent> {
        let external_order_id = str_field(payload, "id");
        if external_order_id.is_empty() {
            return Err(AppError::validation("Shopify order payload has no id"));
        }

        let line_items = payload["line_items"]
            .as_array()
            .map(|items| items.iter().map(|i| self.parse_line(i)).collect())
            .unwrap_or_default();

        let customer = payload["customer"].as_object().map(|c| CustomerInfo {
            name: format!(
                "{} {}",
                c.get("first_name").and_then(Value::as_str).unwrap_or(""),
                c.get("last_name").and_then(Value::as_str).unwrap_or("")
            )
            .trim()
            .to_string(),
            email: c.get("email").and_then(Value::as_str).map(String::from),
        });

        Ok(OrderEvent {
            connection_id: connection.id.clone(),
            external_order_id,
            order_number: str_field(payload, "order_number"),
            line_items,
            total: decimal_field(payload, "total_price"),
            currency: str_field(payload, "currency"),
            payment_state: self.map_payment_state(&str_field(payload, "financial_status")),
            customer,
            created_at: timestamp_field(payload, "created_at"),
        })
    }

    fn parse_refund_event(
        &self,
        connection: &Connection,
        payload: &Value,
    ) -> AppResult<RefundEvent> {
        // Cancelled orders carry cancelled_at on the order payload;
        // refunds arrive as a refund object with refund_line_items.
        if !payload["cancelled_at"].is_null() {
            let external_order_id = str_field(payload, "id");
            if external_order_id.is_empty() {
                return Err(AppError::validation("Shopify cancellation payload has no id"));
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
            return Err(AppError::validation("Shopify refund payload has no order_id"));
        }
        let lines = payload["refund_line_items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|i| RefundedLine {
                        sku: str_field(&i["line_item"], "sku"),
                        quantity: i["quantity"].as_i64().unwrap_or(0),
                        unit_price: decimal_field(&i["line_item"], "price"),
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
        let url = Self::api_url(connection, "orders.json");
        let mut request = self
            .client
            .get(&url)
            .header("X-Shopify-Access-Token", &connection.credentials.key)
            .query(&[("limit", "100"), ("status", "any")]);

        if let Some(since) = since {
            let after = chrono::DateTime::from_timestamp_millis(since)
                .unwrap_or_default()
                .to_rfc3339();
            request = request.query(&[("updated_at_min", after.as_str())]);
        }

        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Storefront, response).await);
        }

        let body: Value = response.json().await.map_err(transport_error)?;
        body["orders"]
            .as_array()
            .map(|orders| {
                orders
                    .iter()
                    .map(|p| self.parse_order_event(connection, p))
                    .collect()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn set_stock_level(
        &self,
        connection: &Connection,
        sku: &str,
        quantity: i64,
    ) -> AppResult<()> {
        let variant_id = self.find_variant_id(connection, sku).await?;
        let url = Self::api_url(connection, &format!("variants/{variant_id}.json"));

        let response = self
            .client
            .put(&url)
            .header("X-Shopify-Access-Token", &connection.credentials.key)
            .json(&json!({
                "variant": {
                    "id": variant_id,
                    "inventory_quantity": quantity,
                }
            }))
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Storefront, response).await);
        }
        tracing::debug!(sku, quantity, "Shopify stock updated");
        Ok(())
    }

    async fn create_or_update_product(
        &self,
        connection: &Connection,
        product: &StorefrontProduct,
    ) -> AppResult<()> {
        let body = json!({
            "product": {
                "title": product.name,
                "variants": [{
                    "sku": product.sku,
                    "price": product.price.to_string(),
                    "inventory_quantity": product.quantity,
                }]
            }
        });

        match self.find_variant_id(connection, &product.sku).await {
            Ok(variant_id) => {
                let url = Self::api_url(connection, &format!("variants/{variant_id}.json"));
                let response = self
                    .client
                    .put(&url)
                    .header("X-Shopify-Access-Token", &connection.credentials.key)
                    .json(&json!({
                        "variant": {
                            "id": variant_id,
                            "price": product.price.to_string(),
                            "inventory_quantity": product.quantity,
                        }
                    }))
                    .send()
                    .await
                    .map_err(transport_error)?;
                if !response.status().is_success() {
                    return Err(error_for_response(RemoteSystem::Storefront, response).await);
                }
            }
            Err(err) if err.remote_status() == Some(404) => {
                let url = Self::api_url(connection, "products.json");
                let response = self
                    .client
                    .post(&url)
                    .header("X-Shopify-Access-Token", &connection.credentials.key)
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
