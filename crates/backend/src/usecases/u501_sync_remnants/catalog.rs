use contracts::usecases::u501_sync_remnants::PaginationStrategy;

use super::marketplace_api::CatalogPageSource;
use super::reconciler::OfferIdSet;
use crate::shared::error::SyncResult;

/// Выкачивает весь каталог площадки и возвращает артикулы всех предложений
///
/// Ошибка любой страницы прерывает чтение целиком, частичный результат не возвращается.
pub async fn fetch_offer_ids<S: CatalogPageSource + ?Sized>(
    source: &S,
    strategy: PaginationStrategy,
) -> SyncResult<OfferIdSet> {
    let mut offer_ids = OfferIdSet::new();
    let mut fetched = 0usize;
    let mut token = String::new();
    let mut page_no = 0usize;

    loop {
        page_no += 1;
        let page = source.fetch_page(&token).await?;
        let batch_size = page.offer_ids.len();
        fetched += batch_size;
        offer_ids.extend(page.offer_ids);

        tracing::debug!(
            "Catalog page {}: {} items, total so far: {}, reported total: {:?}",
            page_no,
            batch_size,
            fetched,
            page.total
        );

        let next_token = page.next_token.filter(|t| !t.is_empty());

        match strategy {
            PaginationStrategy::ContinuationToken => match next_token {
                Some(next) => token = next,
                None => break,
            },
            PaginationStrategy::RunningTotal => {
                if page.total == Some(fetched) {
                    break;
                }
                // Пустая страница до достижения total: дальше площадка ничего не отдаст
                if batch_size == 0 {
                    tracing::warn!(
                        "Catalog returned empty page before reaching total {:?} (fetched {})",
                        page.total,
                        fetched
                    );
                    break;
                }
                token = next_token.unwrap_or_default();
            }
        }
    }

    tracing::info!(
        "Catalog fetched: {} pages, {} offers ({} unique)",
        page_no,
        fetched,
        offer_ids.len()
    );

    Ok(offer_ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::error::{SyncError, UpstreamError};
    use crate::usecases::u501_sync_remnants::marketplace_api::CatalogPage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Отдает заранее заготовленные страницы и запоминает запрошенные токены
    struct ScriptedCatalog {
        pages: Mutex<Vec<SyncResult<CatalogPage>>>,
        tokens: Mutex<Vec<String>>,
    }

    impl ScriptedCatalog {
        fn new(pages: Vec<SyncResult<CatalogPage>>) -> Self {
            Self {
                pages: Mutex::new(pages.into_iter().rev().collect()),
                tokens: Mutex::new(Vec::new()),
            }
        }

        fn tokens(&self) -> Vec<String> {
            self.tokens.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CatalogPageSource for ScriptedCatalog {
        async fn fetch_page(&self, token: &str) -> SyncResult<CatalogPage> {
            self.tokens.lock().unwrap().push(token.to_string());
            self.pages
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| panic!("unexpected page request with token '{}'", token))
        }
    }

    fn page(ids: &[&str], next: Option<&str>, total: Option<usize>) -> SyncResult<CatalogPage> {
        Ok(CatalogPage {
            offer_ids: ids.iter().map(|s| s.to_string()).collect(),
            next_token: next.map(str::to_string),
            total,
        })
    }

    #[tokio::test]
    async fn test_continuation_token_stops_on_empty_token() {
        let source = ScriptedCatalog::new(vec![
            page(&["1", "2"], Some("p2"), None),
            page(&["3"], Some(""), None),
        ]);
        let ids = fetch_offer_ids(&source, PaginationStrategy::ContinuationToken)
            .await
            .unwrap();
        assert_eq!(ids.iter().collect::<Vec<_>>(), vec!["1", "2", "3"]);
        assert_eq!(source.tokens(), vec!["", "p2"]);
    }

    #[tokio::test]
    async fn test_running_total_stops_when_total_reached() {
        let source = ScriptedCatalog::new(vec![
            page(&["a", "b"], Some("b"), Some(3)),
            page(&["c"], Some("c"), Some(3)),
        ]);
        let ids = fetch_offer_ids(&source, PaginationStrategy::RunningTotal)
            .await
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(source.tokens(), vec!["", "b"]);
    }

    #[tokio::test]
    async fn test_running_total_ignores_token_presence() {
        // OZON всегда отдает last_id, конец выдачи определяется только по total
        let source = ScriptedCatalog::new(vec![page(&["a"], Some("a"), Some(1))]);
        let ids = fetch_offer_ids(&source, PaginationStrategy::RunningTotal)
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_running_total_stops_on_empty_page() {
        let source = ScriptedCatalog::new(vec![
            page(&["a"], Some("a"), Some(5)),
            page(&[], Some(""), Some(5)),
        ]);
        let ids = fetch_offer_ids(&source, PaginationStrategy::RunningTotal)
            .await
            .unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[tokio::test]
    async fn test_page_failure_propagates() {
        let source = ScriptedCatalog::new(vec![
            page(&["1"], Some("p2"), None),
            Err(UpstreamError::Status {
                status: 500,
                body: "boom".into(),
            }
            .into()),
        ]);
        let err = fetch_offer_ids(&source, PaginationStrategy::ContinuationToken)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Upstream(UpstreamError::Status { status: 500, .. })
        ));
    }
}
