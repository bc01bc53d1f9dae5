use chrono::{SubsecRound, Utc};
use contracts::usecases::u501_sync_remnants::{
    FeedRow, PriceUpdate, StockUpdate, SyncMode, SyncReport, SyncTarget,
};
use std::sync::Arc;
use uuid::Uuid;

use super::catalog::fetch_offer_ids;
use super::marketplace_api::{MarketplaceApi, UpdateSink};
use super::reconciler::{build_price_updates, build_stock_updates, OfferIdSet};
use crate::shared::batch::{batch_count, divide};
use crate::shared::error::SyncResult;

/// Executor для UseCase выгрузки остатков и цен в одну цель (площадка + кампания + склад)
///
/// Пакеты отправляются строго последовательно. Если пакет N упал, пакеты до него
/// уже применены на площадке и не откатываются.
pub struct SyncExecutor {
    api: Arc<dyn MarketplaceApi>,
    target: SyncTarget,
    dry_run: bool,
}

impl SyncExecutor {
    pub fn new(api: Arc<dyn MarketplaceApi>, target: SyncTarget) -> Self {
        Self {
            api,
            target,
            dry_run: false,
        }
    }

    /// В режиме dry-run пакеты собираются, но не отправляются
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn target(&self) -> &SyncTarget {
        &self.target
    }

    /// Полный проход: каталог -> остатки -> цены
    pub async fn execute(&self, rows: &[FeedRow]) -> SyncResult<SyncReport> {
        self.run(rows, SyncMode::All).await
    }

    /// Выполнить выгрузку в заданном режиме
    pub async fn run(&self, rows: &[FeedRow], mode: SyncMode) -> SyncResult<SyncReport> {
        let session_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        tracing::info!(
            "Starting sync for target '{}' ({}), mode: {:?}, session: {}",
            self.target.name,
            self.target.marketplace.display_name(),
            mode,
            session_id
        );

        let offer_ids = self.fetch_offer_ids().await?;

        let mut stocks = Vec::new();
        let mut prices = Vec::new();
        let mut stock_batches = 0;
        let mut price_batches = 0;

        // Каждый проход получает свою копию множества артикулов
        if mode.includes_stocks() {
            stocks = self.build_stocks(rows, offer_ids.clone())?;
        }
        if mode.includes_prices() {
            prices = build_price_updates(rows, &offer_ids)?;
        }

        if mode.includes_stocks() {
            stock_batches = self.send_stocks(&stocks).await?;
        }
        if mode.includes_prices() {
            price_batches = self.send_prices(&prices).await?;
        }

        let non_empty_stocks = non_empty(&stocks);
        tracing::info!(
            "Sync for target '{}' finished: {} stocks ({} non-empty) in {} batches, \
             {} prices in {} batches",
            self.target.name,
            stocks.len(),
            non_empty_stocks.len(),
            stock_batches,
            prices.len(),
            price_batches
        );

        Ok(SyncReport {
            session_id,
            target: self.target.name.clone(),
            marketplace: self.target.marketplace,
            mode,
            dry_run: self.dry_run,
            started_at,
            completed_at: Utc::now(),
            stocks,
            non_empty_stocks,
            prices,
            stock_batches,
            price_batches,
        })
    }

    /// Выгрузить только остатки. Возвращает (ненулевые, все)
    pub async fn upload_stocks(
        &self,
        rows: &[FeedRow],
    ) -> SyncResult<(Vec<StockUpdate>, Vec<StockUpdate>)> {
        let report = self.run(rows, SyncMode::Stocks).await?;
        Ok((report.non_empty_stocks, report.stocks))
    }

    /// Выгрузить только цены
    pub async fn upload_prices(&self, rows: &[FeedRow]) -> SyncResult<Vec<PriceUpdate>> {
        let report = self.run(rows, SyncMode::Prices).await?;
        Ok(report.prices)
    }

    async fn fetch_offer_ids(&self) -> SyncResult<OfferIdSet> {
        fetch_offer_ids(self.api.as_ref(), self.target.marketplace.pagination()).await
    }

    fn build_stocks(
        &self,
        rows: &[FeedRow],
        offer_ids: OfferIdSet,
    ) -> SyncResult<Vec<StockUpdate>> {
        let updated_at = self
            .target
            .marketplace
            .stamps_stock_updates()
            .then(|| Utc::now().trunc_subsecs(0));
        build_stock_updates(rows, offer_ids, self.target.warehouse_id.as_deref(), updated_at)
    }

    async fn send_stocks(&self, stocks: &[StockUpdate]) -> SyncResult<usize> {
        let limit = self.target.limits.stock;
        let total = batch_count(stocks.len(), limit);
        for (idx, batch) in divide(stocks, limit)?.enumerate() {
            if self.dry_run {
                tracing::info!(
                    "[dry-run] Skipping stock batch {}/{} ({} items)",
                    idx + 1,
                    total,
                    batch.len()
                );
                continue;
            }
            tracing::info!("Sending stock batch {}/{} ({} items)", idx + 1, total, batch.len());
            let ack = self.api.apply_stock_batch(batch).await?;
            tracing::debug!("Stock batch {} response: {}", idx + 1, ack);
        }
        Ok(total)
    }

    async fn send_prices(&self, prices: &[PriceUpdate]) -> SyncResult<usize> {
        let limit = self.target.limits.price;
        let total = batch_count(prices.len(), limit);
        for (idx, batch) in divide(prices, limit)?.enumerate() {
            if self.dry_run {
                tracing::info!(
                    "[dry-run] Skipping price batch {}/{} ({} items)",
                    idx + 1,
                    total,
                    batch.len()
                );
                continue;
            }
            tracing::info!("Sending price batch {}/{} ({} items)", idx + 1, total, batch.len());
            let ack = self.api.apply_price_batch(batch).await?;
            tracing::debug!("Price batch {} response: {}", idx + 1, ack);
        }
        Ok(total)
    }
}

fn non_empty(stocks: &[StockUpdate]) -> Vec<StockUpdate> {
    stocks.iter().filter(|s| !s.is_empty()).cloned().collect()
}
