use chrono::{DateTime, Utc};
use contracts::usecases::u501_sync_remnants::{FeedRow, PriceUpdate, StockUpdate};
use std::collections::HashSet;

use super::price::parse_price;
use crate::shared::error::{SyncError, SyncResult};

/// Остаток, который выгружается для позиции с пометкой ">10"
pub const MANY_IN_STOCK: u32 = 100;

/// Множество артикулов каталога площадки с сохранением исходного порядка
///
/// Сверка остатков забирает из множества найденные артикулы, поэтому
/// каждому проходу нужна своя копия (`clone()`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferIdSet {
    order: Vec<String>,
    present: HashSet<String>,
}

impl OfferIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Повторные артикулы игнорируются
    pub fn insert(&mut self, offer_id: impl Into<String>) -> bool {
        let offer_id = offer_id.into();
        if self.present.contains(&offer_id) {
            return false;
        }
        self.present.insert(offer_id.clone());
        self.order.push(offer_id);
        true
    }

    pub fn contains(&self, offer_id: &str) -> bool {
        self.present.contains(offer_id)
    }

    pub fn remove(&mut self, offer_id: &str) -> bool {
        self.present.remove(offer_id)
    }

    pub fn len(&self) -> usize {
        self.present.len()
    }

    pub fn is_empty(&self) -> bool {
        self.present.is_empty()
    }

    /// Оставшиеся артикулы в порядке добавления
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order
            .iter()
            .filter(|id| self.present.contains(id.as_str()))
            .map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for OfferIdSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = OfferIdSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for OfferIdSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

/// Перевод остатка из прайс-листа в количество для площадки
///
/// ">10" выгружается как 100. Единичный остаток выгружается как 0:
/// последний экземпляр на площадке не продаем.
pub fn resolve_stock_count(label: &str) -> SyncResult<u32> {
    match label.trim() {
        ">10" => Ok(MANY_IN_STOCK),
        "1" => Ok(0),
        other => other
            .parse::<u32>()
            .map_err(|e| SyncError::Parse(format!("stock quantity '{}': {}", label, e))),
    }
}

/// Остатки по всем артикулам каталога
///
/// Сначала идут найденные в прайс-листе (в порядке строк файла), затем
/// все оставшиеся артикулы каталога с нулевым остатком. `offer_ids` -
/// рабочая копия, найденные артикулы из нее удаляются, так что одна строка
/// занимает не больше одного артикула и повтор кода в файле не дает дубля.
pub fn build_stock_updates(
    rows: &[FeedRow],
    mut offer_ids: OfferIdSet,
    warehouse_id: Option<&str>,
    updated_at: Option<DateTime<Utc>>,
) -> SyncResult<Vec<StockUpdate>> {
    let mut stocks = Vec::with_capacity(offer_ids.len());
    let make = |offer_id: &str, count: u32| StockUpdate {
        offer_id: offer_id.to_string(),
        count,
        warehouse_id: warehouse_id.map(str::to_string),
        updated_at,
    };

    for row in rows {
        if !offer_ids.contains(&row.code) {
            continue;
        }
        let count = resolve_stock_count(&row.quantity_label)?;
        stocks.push(make(&row.code, count));
        offer_ids.remove(&row.code);
    }

    let matched = stocks.len();
    for offer_id in offer_ids.iter() {
        stocks.push(make(offer_id, 0));
    }

    tracing::debug!(
        "Stock updates built: {} matched in feed, {} zeroed",
        matched,
        stocks.len() - matched
    );

    Ok(stocks)
}

/// Цены по артикулам, которые есть и в прайс-листе, и в каталоге
///
/// Множество не изменяется; строки без артикула на площадке пропускаются.
pub fn build_price_updates(
    rows: &[FeedRow],
    offer_ids: &OfferIdSet,
) -> SyncResult<Vec<PriceUpdate>> {
    rows.iter()
        .filter(|row| offer_ids.contains(&row.code))
        .map(|row| -> SyncResult<PriceUpdate> {
            Ok(PriceUpdate::rub(row.code.clone(), parse_price(&row.price_label)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(items: &[&str]) -> OfferIdSet {
        items.iter().copied().collect()
    }

    fn counts(stocks: &[StockUpdate]) -> Vec<(&str, u32)> {
        stocks.iter().map(|s| (s.offer_id.as_str(), s.count)).collect()
    }

    #[test]
    fn test_offer_id_set_keeps_order_and_dedups() {
        let mut set = ids(&["b", "a", "b", "c"]);
        assert_eq!(set.len(), 3);
        assert!(set.remove("a"));
        assert!(!set.remove("a"));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn test_many_in_stock_and_leftover() {
        let rows = vec![FeedRow::new(69791, ">10", "550.00 руб.")];
        let stocks = build_stock_updates(&rows, ids(&["69791", "70000"]), None, None).unwrap();
        assert_eq!(counts(&stocks), vec![("69791", 100), ("70000", 0)]);
    }

    #[test]
    fn test_single_unit_is_zeroed() {
        let rows = vec![FeedRow::new("69791", "1", "550.00 руб.")];
        let stocks = build_stock_updates(&rows, ids(&["69791"]), None, None).unwrap();
        assert_eq!(counts(&stocks), vec![("69791", 0)]);
    }

    #[test]
    fn test_plain_quantity() {
        let rows = vec![FeedRow::new("69791", "5", "550.00 руб.")];
        let stocks = build_stock_updates(&rows, ids(&["69791"]), None, None).unwrap();
        assert_eq!(counts(&stocks), vec![("69791", 5)]);
    }

    #[test]
    fn test_unparseable_quantity_fails() {
        let rows = vec![FeedRow::new("69791", "много", "550.00 руб.")];
        let err = build_stock_updates(&rows, ids(&["69791"]), None, None).unwrap_err();
        assert!(matches!(err, SyncError::Parse(_)));
    }

    #[test]
    fn test_unmatched_rows_are_not_parsed() {
        let rows = vec![FeedRow::new("11111", "много", "нет цены")];
        let stocks = build_stock_updates(&rows, ids(&["69791"]), None, None).unwrap();
        assert_eq!(counts(&stocks), vec![("69791", 0)]);
        assert!(build_price_updates(&rows, &ids(&["69791"])).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_feed_code_claims_offer_once() {
        let rows = vec![
            FeedRow::new("A", "5", "10.00"),
            FeedRow::new("A", "7", "10.00"),
        ];
        let stocks = build_stock_updates(&rows, ids(&["A", "B"]), None, None).unwrap();
        assert_eq!(counts(&stocks), vec![("A", 5), ("B", 0)]);
    }

    #[test]
    fn test_every_offer_reported_exactly_once() {
        let rows = vec![
            FeedRow::new("3", ">10", "1.00"),
            FeedRow::new("zzz", "4", "1.00"),
            FeedRow::new("1", "2", "1.00"),
        ];
        let offer_ids = ids(&["1", "2", "3", "4"]);
        let stocks = build_stock_updates(&rows, offer_ids.clone(), None, None).unwrap();

        assert_eq!(counts(&stocks), vec![("3", 100), ("1", 2), ("2", 0), ("4", 0)]);
        let reported: OfferIdSet = stocks.iter().map(|s| s.offer_id.clone()).collect();
        assert_eq!(reported.len(), stocks.len());
        assert_eq!(reported.len(), offer_ids.len());
        assert!(offer_ids.iter().all(|id| reported.contains(id)));
    }

    #[test]
    fn test_caller_copy_is_untouched() {
        let rows = vec![FeedRow::new("69791", "5", "550.00 руб.")];
        let offer_ids = ids(&["69791", "70000"]);
        build_stock_updates(&rows, offer_ids.clone(), None, None).unwrap();
        assert_eq!(offer_ids.len(), 2);
        assert!(offer_ids.contains("69791"));
    }

    #[test]
    fn test_warehouse_and_timestamp_are_attached() {
        let now = Utc::now();
        let rows = vec![FeedRow::new("A", "3", "1.00")];
        let stocks = build_stock_updates(&rows, ids(&["A", "B"]), Some("wh-1"), Some(now)).unwrap();
        assert!(stocks
            .iter()
            .all(|s| s.warehouse_id.as_deref() == Some("wh-1") && s.updated_at == Some(now)));
    }

    #[test]
    fn test_price_updates_only_for_matched_offers() {
        let rows = vec![FeedRow::new(69791, ">10", "550.00 руб.")];
        let prices = build_price_updates(&rows, &ids(&["69791", "70000"])).unwrap();
        assert_eq!(prices, vec![PriceUpdate::rub("69791", 550)]);
        assert_eq!(prices[0].currency, "RUB");
    }

    #[test]
    fn test_price_updates_do_not_consume_offers() {
        let rows = vec![
            FeedRow::new("A", "2", "100.00"),
            FeedRow::new("A", "2", "120.00"),
        ];
        let prices = build_price_updates(&rows, &ids(&["A"])).unwrap();
        assert_eq!(prices.len(), 2);
    }
}
