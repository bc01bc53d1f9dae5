use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Валюта всех выгружаемых цен
pub const CURRENCY_RUB: &str = "RUB";

/// Остаток по одному предложению, независимо от формата площадки
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub offer_id: String,
    pub count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warehouse_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl StockUpdate {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Цена по одному предложению
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub offer_id: String,
    pub price: u64,
    pub currency: String,
}

impl PriceUpdate {
    pub fn rub(offer_id: impl Into<String>, price: u64) -> Self {
        Self {
            offer_id: offer_id.into(),
            price,
            currency: CURRENCY_RUB.to_string(),
        }
    }
}
