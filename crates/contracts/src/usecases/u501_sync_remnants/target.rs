use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::enums::marketplace_type::MarketplaceType;

/// Максимальные размеры пакетов для методов обновления
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchLimits {
    pub stock: usize,
    pub price: usize,
}

/// Как понять, что каталог площадки выдан целиком
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationStrategy {
    /// Выдача закончилась, когда пришел пустой токен следующей страницы
    ContinuationToken,
    /// Выдача закончилась, когда накопленное число товаров равно total из ответа
    RunningTotal,
}

/// Куда выгружаем: площадка + магазин/кампания + склад
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncTarget {
    pub name: String,
    pub marketplace: MarketplaceType,
    pub warehouse_id: Option<String>,
    pub limits: BatchLimits,
}

impl SyncTarget {
    pub fn new(name: impl Into<String>, marketplace: MarketplaceType) -> Self {
        Self {
            name: name.into(),
            marketplace,
            warehouse_id: None,
            limits: marketplace.default_batch_limits(),
        }
    }

    pub fn with_warehouse(mut self, warehouse_id: impl Into<String>) -> Self {
        self.warehouse_id = Some(warehouse_id.into());
        self
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }
}

/// Что выгружать за запуск
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[default]
    All,
    Stocks,
    Prices,
}

impl SyncMode {
    pub fn includes_stocks(&self) -> bool {
        matches!(self, SyncMode::All | SyncMode::Stocks)
    }

    pub fn includes_prices(&self) -> bool {
        matches!(self, SyncMode::All | SyncMode::Prices)
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(SyncMode::All),
            "stocks" => Ok(SyncMode::Stocks),
            "prices" => Ok(SyncMode::Prices),
            other => Err(format!(
                "unknown sync mode '{}', expected all | stocks | prices",
                other
            )),
        }
    }
}
