use async_trait::async_trait;
use contracts::usecases::u501_sync_remnants::{PriceUpdate, StockUpdate};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use super::marketplace_api::{BatchAck, CatalogPage, CatalogPageSource, UpdateSink};
use crate::shared::error::{SyncError, SyncResult, UpstreamError};
use crate::shared::format::preview;

pub const OZON_BASE_URL: &str = "https://api-seller.ozon.ru";

/// Максимальный limit для /v2/product/list
const PRODUCT_LIST_LIMIT: i32 = 1000;

/// HTTP-клиент для работы с OZON Seller API
pub struct OzonApiClient {
    client: reqwest::Client,
    base_url: String,
    client_id: String,
    api_key: String,
}

impl OzonApiClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> SyncResult<Self> {
        let client_id = client_id.into();
        let api_key = api_key.into();

        // Проверка обязательных полей для OZON API
        if client_id.trim().is_empty() {
            return Err(SyncError::Config(
                "Client-Id is required for OZON API".to_string(),
            ));
        }
        if api_key.trim().is_empty() {
            return Err(SyncError::Config(
                "Api-Key is required for OZON API".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UpstreamError::from)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client_id,
            api_key,
        })
    }

    /// Получить страницу товаров через POST /v2/product/list
    pub async fn fetch_product_list(&self, last_id: &str) -> SyncResult<OzonProductListResult> {
        let request_body = OzonProductListRequest {
            filter: OzonProductListFilter {
                visibility: "ALL".to_string(),
            },
            last_id: last_id.to_string(),
            limit: PRODUCT_LIST_LIMIT,
        };
        let response: OzonProductListResponse =
            self.post("/v2/product/list", &request_body).await?;
        Ok(response.result)
    }

    /// Обновить остатки через POST /v1/product/import/stocks
    pub async fn update_stocks(&self, batch: &[StockUpdate]) -> SyncResult<BatchAck> {
        let request = stocks_request(batch)?;
        self.post("/v1/product/import/stocks", &request).await
    }

    /// Обновить цены через POST /v1/product/import/prices
    pub async fn update_prices(&self, batch: &[PriceUpdate]) -> SyncResult<BatchAck> {
        self.post("/v1/product/import/prices", &prices_request(batch))
            .await
    }

    async fn post<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request_body: &Req,
    ) -> SyncResult<Resp> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("OZON API request: POST {} (Client-Id: {})", url, self.client_id);

        let response = self
            .client
            .post(&url)
            .header("Client-Id", &self.client_id)
            .header("Api-Key", &self.api_key)
            .json(request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("OZON API request failed: {} {}", status, body);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        tracing::debug!("OZON API response preview: {}", preview(&body));

        serde_json::from_str::<Resp>(&body).map_err(|e| {
            tracing::error!("Failed to parse OZON API response. Error: {}", e);
            UpstreamError::Decode(format!("{}. Response: {}", e, preview(&body))).into()
        })
    }
}

#[async_trait]
impl CatalogPageSource for OzonApiClient {
    async fn fetch_page(&self, token: &str) -> SyncResult<CatalogPage> {
        Ok(self.fetch_product_list(token).await?.into())
    }
}

#[async_trait]
impl UpdateSink for OzonApiClient {
    async fn apply_stock_batch(&self, batch: &[StockUpdate]) -> SyncResult<BatchAck> {
        self.update_stocks(batch).await
    }

    async fn apply_price_batch(&self, batch: &[PriceUpdate]) -> SyncResult<BatchAck> {
        self.update_prices(batch).await
    }
}

/// Склад в OZON задается числовым идентификатором
fn parse_warehouse_id(warehouse_id: &str) -> SyncResult<i64> {
    warehouse_id.trim().parse::<i64>().map_err(|_| {
        SyncError::InvalidArgument(format!(
            "OZON warehouse id must be numeric, got '{}'",
            warehouse_id
        ))
    })
}

fn stocks_request(batch: &[StockUpdate]) -> SyncResult<OzonStocksRequest> {
    let stocks = batch
        .iter()
        .map(|s| -> SyncResult<OzonStockItem> {
            Ok(OzonStockItem {
                offer_id: s.offer_id.clone(),
                stock: s.count,
                warehouse_id: s.warehouse_id.as_deref().map(parse_warehouse_id).transpose()?,
            })
        })
        .collect::<SyncResult<Vec<_>>>()?;
    Ok(OzonStocksRequest { stocks })
}

fn prices_request(batch: &[PriceUpdate]) -> OzonPricesRequest {
    OzonPricesRequest {
        prices: batch
            .iter()
            .map(|p| OzonPriceItem {
                auto_action_enabled: "UNKNOWN".to_string(),
                currency_code: p.currency.clone(),
                offer_id: p.offer_id.clone(),
                old_price: "0".to_string(),
                price: p.price.to_string(),
            })
            .collect(),
    }
}

// ============================================================================
// Request/Response structures
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListRequest {
    pub filter: OzonProductListFilter,
    pub last_id: String,
    pub limit: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListFilter {
    pub visibility: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListResponse {
    pub result: OzonProductListResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListResult {
    #[serde(default)]
    pub items: Vec<OzonProductListItem>,
    pub total: i64,
    #[serde(default)]
    pub last_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonProductListItem {
    #[serde(default)]
    pub product_id: i64,
    pub offer_id: String,
}

impl From<OzonProductListResult> for CatalogPage {
    fn from(result: OzonProductListResult) -> Self {
        CatalogPage {
            offer_ids: result.items.into_iter().map(|i| i.offer_id).collect(),
            next_token: Some(result.last_id),
            total: usize::try_from(result.total).ok(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonStocksRequest {
    pub stocks: Vec<OzonStockItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonStockItem {
    pub offer_id: String,
    pub stock: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonPricesRequest {
    pub prices: Vec<OzonPriceItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OzonPriceItem {
    pub auto_action_enabled: String,
    pub currency_code: String,
    pub offer_id: String,
    pub old_price: String,
    pub price: String,
}
