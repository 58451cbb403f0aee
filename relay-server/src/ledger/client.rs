//! LedgerClient — REST client for the inventory-of-record API

use serde_json::{Value, json};
use shared::error::{AppResult, ErrorCode};
use shared::models::{LedgerProduct, StockRow};

use super::{LedgerAdapter, ReturnRequest, ReturnResult, SaleRequest, SaleResult, select_product};
use crate::platform::{RemoteSystem, decimal_field, error_for_response, str_field, transport_error};
use async_trait::async_trait;

/// REST client for the ledger, authenticated with a static API key
pub struct LedgerClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl LedgerClient {
    pub fn new(client: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{path}", self.base_url)
    }

    fn parse_product(value: &Value) -> LedgerProduct {
        LedgerProduct {
            id: str_field(value, "id"),
            name: str_field(value, "name"),
            sku: value["sku"].as_str().filter(|s| !s.is_empty()).map(String::from),
            variant_of: value["variant_of"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(String::from),
            price: decimal_field(value, "price"),
        }
    }
}

#[async_trait]
impl LedgerAdapter for LedgerClient {
    async fn list_stock(&self, location_id: Option<&str>) -> AppResult<Vec<StockRow>> {
        let mut request = self
            .client
            .get(self.url("stock"))
            .header("X-Api-Key", &self.api_key);
        if let Some(location) = location_id {
            request = request.query(&[("location", location)]);
        }

        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Ledger, response).await);
        }

        let rows: Vec<Value> = response.json().await.map_err(transport_error)?;
        Ok(rows
            .iter()
            .map(|row| StockRow {
                product_id: str_field(row, "product_id"),
                sku: row["sku"].as_str().filter(|s| !s.is_empty()).map(String::from),
                quantity: row["quantity"].as_i64().unwrap_or(0),
            })
            .collect())
    }

    async fn list_products(&self) -> AppResult<Vec<LedgerProduct>> {
        let response = self
            .client
            .get(self.url("products"))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Ledger, response).await);
        }

        let rows: Vec<Value> = response.json().await.map_err(transport_error)?;
        Ok(rows.iter().map(Self::parse_product).collect())
    }

    async fn find_product_by_sku(&self, sku: &str) -> AppResult<Option<LedgerProduct>> {
        let response = self
            .client
            .get(self.url("products"))
            .query(&[("sku", sku)])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Ledger, response).await);
        }

        let rows: Vec<Value> = response.json().await.map_err(transport_error)?;
        Ok(select_product(rows.iter().map(Self::parse_product).collect()))
    }

    async fn record_sale(&self, request: &SaleRequest) -> AppResult<SaleResult> {
        let body = json!({
            "external_ref": request.external_ref,
            "location": request.location_id,
            "counterparty": request.counterparty,
            "currency": request.currency,
            "payment_method": request.payment_method,
            "total": request.total,
            "lines": request.lines.iter().map(|l| json!({
                "product_id": l.product_id,
                "sku": l.sku,
                "name": l.name,
                "quantity": l.quantity,
                "unit_price": l.unit_price,
            })).collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(self.url("documents/sales"))
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Ledger, response).await);
        }

        let result: Value = response.json().await.map_err(transport_error)?;
        let transaction_id = str_field(&result, "id");
        if transaction_id.is_empty() {
            return Err(shared::AppError::with_message(
                ErrorCode::LedgerRejected,
                "ledger sale response carried no document id",
            ));
        }
        Ok(SaleResult { transaction_id })
    }

    async fn record_return(&self, request: &ReturnRequest) -> AppResult<ReturnResult> {
        let body = json!({
            "external_ref": request.external_ref,
            "location": request.location_id,
            "lines": request.lines.iter().map(|l| json!({
                "product_id": l.product_id,
                "sku": l.sku,
                "name": l.name,
                "quantity": l.quantity,
                "unit_price": l.unit_price,
            })).collect::<Vec<_>>(),
        });

        let response = self
            .client
            .post(self.url("documents/returns"))
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(error_for_response(RemoteSystem::Ledger, response).await);
        }

        let result: Value = response.json().await.map_err(transport_error)?;
        let transaction_id = str_field(&result, "id");
        if transaction_id.is_empty() {
            return Err(shared::AppError::with_message(
                ErrorCode::LedgerRejected,
                "ledger return response carried no document id",
            ));
        }
        Ok(ReturnResult { transaction_id })
    }
}
