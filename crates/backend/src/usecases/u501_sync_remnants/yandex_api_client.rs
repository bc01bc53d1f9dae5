use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use contracts::usecases::u501_sync_remnants::{PriceUpdate, StockUpdate, CURRENCY_RUB};
use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;

use super::marketplace_api::{BatchAck, CatalogPage, CatalogPageSource, UpdateSink};
use crate::shared::error::{SyncError, SyncResult, UpstreamError};
use crate::shared::format::preview;

pub const YANDEX_BASE_URL: &str = "https://api.partner.market.yandex.ru";

/// Максимальный limit для offer-mapping-entries
const OFFER_MAPPING_LIMIT: i32 = 200;

/// Код рубля в Partner API Маркета
const YANDEX_RUB_CODE: &str = "RUR";

/// HTTP-клиент для работы с Yandex Market Partner API (одна кампания)
pub struct YandexApiClient {
    client: reqwest::Client,
    base_url: String,
    campaign_id: String,
    token: String,
}

impl YandexApiClient {
    pub fn new(
        base_url: impl Into<String>,
        campaign_id: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> SyncResult<Self> {
        let campaign_id = campaign_id.into();
        let token = token.into();

        if campaign_id.trim().is_empty() {
            return Err(SyncError::Config(
                "Campaign ID is required for Yandex Market API".to_string(),
            ));
        }
        if token.trim().is_empty() {
            return Err(SyncError::Config(
                "Bearer token (API Key) is required for Yandex Market API".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(UpstreamError::from)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            campaign_id,
            token,
        })
    }

    /// Получить страницу товаров кампании
    /// Endpoint: GET /campaigns/{campaignId}/offer-mapping-entries
    pub async fn fetch_product_list(
        &self,
        page_token: &str,
    ) -> SyncResult<YandexProductListResult> {
        #[derive(Serialize)]
        struct YandexListQueryParams<'a> {
            page_token: &'a str,
            limit: i32,
        }

        let query = YandexListQueryParams {
            page_token,
            limit: OFFER_MAPPING_LIMIT,
        };
        let response: YandexProductListResponse = self
            .request(Method::GET, "offer-mapping-entries", Some(&query), None::<&()>)
            .await?;
        Ok(response.result)
    }

    /// Обновить остатки: PUT /campaigns/{campaignId}/offers/stocks
    pub async fn update_stocks(&self, batch: &[StockUpdate]) -> SyncResult<BatchAck> {
        let body = stocks_request(batch)?;
        self.request(Method::PUT, "offers/stocks", None::<&()>, Some(&body))
            .await
    }

    /// Обновить цены: POST /campaigns/{campaignId}/offer-prices/updates
    pub async fn update_prices(&self, batch: &[PriceUpdate]) -> SyncResult<BatchAck> {
        let body = prices_request(batch);
        self.request(Method::POST, "offer-prices/updates", None::<&()>, Some(&body))
            .await
    }

    async fn request<Q: Serialize + ?Sized, B: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> SyncResult<Resp> {
        let url = format!("{}/campaigns/{}/{}", self.base_url, self.campaign_id, path);
        tracing::debug!("Yandex Market API request: {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json");
        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!("Yandex Market API request failed: {} {}", status, text);
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: text,
            }
            .into());
        }

        tracing::debug!("Yandex Market API response preview: {}", preview(&text));

        serde_json::from_str::<Resp>(&text).map_err(|e| {
            tracing::error!("Failed to parse Yandex Market API response. Error: {}", e);
            UpstreamError::Decode(format!("{}. Response: {}", e, preview(&text))).into()
        })
    }
}

#[async_trait]
impl CatalogPageSource for YandexApiClient {
    async fn fetch_page(&self, token: &str) -> SyncResult<CatalogPage> {
        Ok(self.fetch_product_list(token).await?.into())
    }
}

#[async_trait]
impl UpdateSink for YandexApiClient {
    async fn apply_stock_batch(&self, batch: &[StockUpdate]) -> SyncResult<BatchAck> {
        self.update_stocks(batch).await
    }

    async fn apply_price_batch(&self, batch: &[PriceUpdate]) -> SyncResult<BatchAck> {
        self.update_prices(batch).await
    }
}

/// ID склада Маркет ждет числом; нечисловое значение отправляется как есть
fn warehouse_value(warehouse_id: &str) -> serde_json::Value {
    match warehouse_id.trim().parse::<i64>() {
        Ok(id) => serde_json::Value::from(id),
        Err(_) => serde_json::Value::from(warehouse_id),
    }
}

fn stocks_request(batch: &[StockUpdate]) -> SyncResult<YandexStocksRequest> {
    let fallback_time = Utc::now();
    let skus = batch
        .iter()
        .map(|s| -> SyncResult<YandexSkuStock> {
            let warehouse_id = s.warehouse_id.as_deref().ok_or_else(|| {
                SyncError::InvalidArgument(format!(
                    "warehouse id is required for Yandex Market stock of '{}'",
                    s.offer_id
                ))
            })?;
            Ok(YandexSkuStock {
                sku: s.offer_id.clone(),
                warehouse_id: warehouse_value(warehouse_id),
                items: vec![YandexStockItem {
                    count: s.count,
                    item_type: "FIT".to_string(),
                    updated_at: s
                        .updated_at
                        .unwrap_or(fallback_time)
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                }],
            })
        })
        .collect::<SyncResult<Vec<_>>>()?;
    Ok(YandexStocksRequest { skus })
}

fn prices_request(batch: &[PriceUpdate]) -> YandexPricesRequest {
    YandexPricesRequest {
        offers: batch
            .iter()
            .map(|p| YandexOfferPrice {
                id: p.offer_id.clone(),
                price: YandexPrice {
                    value: p.price,
                    currency_id: if p.currency == CURRENCY_RUB {
                        YANDEX_RUB_CODE.to_string()
                    } else {
                        p.currency.clone()
                    },
                },
            })
            .collect(),
    }
}

// ============================================================================
// Request/Response structures
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexProductListResponse {
    pub result: YandexProductListResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexProductListResult {
    #[serde(default)]
    pub paging: YandexPaging,
    #[serde(rename = "offerMappingEntries", default)]
    pub offer_mapping_entries: Vec<YandexOfferMappingEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YandexPaging {
    #[serde(rename = "nextPageToken", default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexOfferMappingEntry {
    pub offer: YandexOffer,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexOffer {
    #[serde(rename = "shopSku")]
    pub shop_sku: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl From<YandexProductListResult> for CatalogPage {
    fn from(result: YandexProductListResult) -> Self {
        CatalogPage {
            offer_ids: result
                .offer_mapping_entries
                .into_iter()
                .map(|e| e.offer.shop_sku)
                .collect(),
            next_token: result.paging.next_page_token,
            total: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexStocksRequest {
    pub skus: Vec<YandexSkuStock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexSkuStock {
    pub sku: String,
    #[serde(rename = "warehouseId")]
    pub warehouse_id: serde_json::Value,
    pub items: Vec<YandexStockItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexStockItem {
    pub count: u32,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexPricesRequest {
    pub offers: Vec<YandexOfferPrice>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexOfferPrice {
    pub id: String,
    pub price: YandexPrice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexPrice {
    pub value: u64,
    #[serde(rename = "currencyId")]
    pub currency_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_product_list_page() {
        let body = r#"{
            "status": "OK",
            "result": {
                "paging": {"nextPageToken": "eyBuZXh0SWQ6IDIzNDIgfQ=="},
                "offerMappingEntries": [
                    {"offer": {"name": "Casio 219RU", "shopSku": "69791", "vendor": "Casio"}},
                    {"offer": {"shopSku": "70000"}}
                ]
            }
        }"#;
        let response: YandexProductListResponse = serde_json::from_str(body).unwrap();
        let page: CatalogPage = response.result.into();
        assert_eq!(page.offer_ids, vec!["69791", "70000"]);
        assert_eq!(page.next_token.as_deref(), Some("eyBuZXh0SWQ6IDIzNDIgfQ=="));
        assert_eq!(page.total, None);
    }

    #[test]
    fn test_last_page_has_no_token() {
        let body = r#"{"result": {"paging": {}, "offerMappingEntries": []}}"#;
        let response: YandexProductListResponse = serde_json::from_str(body).unwrap();
        let page: CatalogPage = response.result.into();
        assert!(page.offer_ids.is_empty());
        assert_eq!(page.next_token, None);
    }

    #[test]
    fn test_stocks_payload() {
        let updated_at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let batch = vec![StockUpdate {
            offer_id: "69791".into(),
            count: 100,
            warehouse_id: Some("123456".into()),
            updated_at: Some(updated_at),
        }];
        assert_eq!(
            serde_json::to_value(stocks_request(&batch).unwrap()).unwrap(),
            json!({"skus": [{
                "sku": "69791",
                "warehouseId": 123456,
                "items": [{"count": 100, "type": "FIT", "updatedAt": "2024-03-01T12:30:00Z"}]
            }]})
        );
    }

    #[test]
    fn test_stocks_require_warehouse() {
        let batch = vec![StockUpdate {
            offer_id: "69791".into(),
            count: 1,
            warehouse_id: None,
            updated_at: None,
        }];
        assert!(matches!(
            stocks_request(&batch),
            Err(SyncError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_prices_payload_uses_rur() {
        let batch = vec![PriceUpdate::rub("69791", 550)];
        assert_eq!(
            serde_json::to_value(prices_request(&batch)).unwrap(),
            json!({"offers": [{"id": "69791", "price": {"value": 550, "currencyId": "RUR"}}]})
        );
    }
}
