use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::target::SyncMode;
use super::updates::{PriceUpdate, StockUpdate};
use crate::enums::marketplace_type::MarketplaceType;

/// Итог выгрузки по одной цели
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub session_id: String,
    pub target: String,
    pub marketplace: MarketplaceType,
    pub mode: SyncMode,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,

    /// Все отправленные остатки (по каждому предложению каталога ровно один)
    pub stocks: Vec<StockUpdate>,
    /// Остатки с ненулевым количеством
    pub non_empty_stocks: Vec<StockUpdate>,
    pub prices: Vec<PriceUpdate>,

    pub stock_batches: usize,
    pub price_batches: usize,
}
