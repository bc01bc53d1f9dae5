use serde::{Deserialize, Serialize};

use crate::usecases::u501_sync_remnants::target::{BatchLimits, PaginationStrategy};

/// Типы маркетплейсов, в которые выгружаются остатки и цены
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketplaceType {
    Ozon,
    YandexMarket,
}

impl MarketplaceType {
    /// Получить код маркетплейса
    pub fn code(&self) -> &'static str {
        match self {
            MarketplaceType::Ozon => "mp-ozon",
            MarketplaceType::YandexMarket => "mp-ym",
        }
    }

    /// Получить человекочитаемое название
    pub fn display_name(&self) -> &'static str {
        match self {
            MarketplaceType::Ozon => "Ozon",
            MarketplaceType::YandexMarket => "Яндекс Маркет",
        }
    }

    pub fn all() -> Vec<MarketplaceType> {
        vec![MarketplaceType::Ozon, MarketplaceType::YandexMarket]
    }

    /// Парсинг из строки
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "mp-ozon" => Some(MarketplaceType::Ozon),
            "mp-ym" => Some(MarketplaceType::YandexMarket),
            _ => None,
        }
    }

    /// Лимиты пакетов по умолчанию (ограничения API площадки)
    pub fn default_batch_limits(&self) -> BatchLimits {
        match self {
            MarketplaceType::Ozon => BatchLimits {
                stock: 100,
                price: 900,
            },
            MarketplaceType::YandexMarket => BatchLimits {
                stock: 2000,
                price: 500,
            },
        }
    }

    /// Признак окончания выдачи каталога у площадки:
    /// OZON отдает общее количество товаров, Маркет - токен следующей страницы
    pub fn pagination(&self) -> PaginationStrategy {
        match self {
            MarketplaceType::Ozon => PaginationStrategy::RunningTotal,
            MarketplaceType::YandexMarket => PaginationStrategy::ContinuationToken,
        }
    }

    /// Требует ли API метку времени у каждой записи остатка
    pub fn stamps_stock_updates(&self) -> bool {
        matches!(self, MarketplaceType::YandexMarket)
    }
}

impl std::fmt::Display for MarketplaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
