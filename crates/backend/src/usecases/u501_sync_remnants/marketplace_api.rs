use async_trait::async_trait;
use contracts::usecases::u501_sync_remnants::{PriceUpdate, StockUpdate};

use crate::shared::error::SyncResult;

/// Одна страница каталога площадки
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub offer_ids: Vec<String>,
    /// Токен/last_id для запроса следующей страницы
    pub next_token: Option<String>,
    /// Общее количество товаров, если площадка его сообщает
    pub total: Option<usize>,
}

/// Ответ площадки на пакет обновлений, как есть
pub type BatchAck = serde_json::Value;

/// Постраничное чтение каталога предложений
#[async_trait]
pub trait CatalogPageSource: Send + Sync {
    /// Первая страница запрашивается с пустым токеном
    async fn fetch_page(&self, token: &str) -> SyncResult<CatalogPage>;
}

/// Отправка пакетов остатков и цен
#[async_trait]
pub trait UpdateSink: Send + Sync {
    async fn apply_stock_batch(&self, batch: &[StockUpdate]) -> SyncResult<BatchAck>;

    async fn apply_price_batch(&self, batch: &[PriceUpdate]) -> SyncResult<BatchAck>;
}

/// Клиент площадки целиком: и каталог, и обновления
pub trait MarketplaceApi: CatalogPageSource + UpdateSink {}

impl<T: CatalogPageSource + UpdateSink> MarketplaceApi for T {}
