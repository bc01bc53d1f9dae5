pub mod feed;
pub mod report;
pub mod target;
pub mod updates;

pub use feed::FeedRow;
pub use report::SyncReport;
pub use target::{BatchLimits, PaginationStrategy, SyncMode, SyncTarget};
pub use updates::{PriceUpdate, StockUpdate, CURRENCY_RUB};

use crate::usecases::common::UseCaseMetadata;

pub struct SyncRemnants;

impl UseCaseMetadata for SyncRemnants {
    fn usecase_index() -> &'static str {
        "u501"
    }

    fn usecase_name() -> &'static str {
        "sync_remnants"
    }

    fn display_name() -> &'static str {
        "Выгрузка остатков и цен"
    }

    fn description() -> &'static str {
        "Обновление остатков и цен на маркетплейсах по прайс-листу поставщика"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        assert_eq!(SyncRemnants::full_name(), "u501_sync_remnants");
    }
}
