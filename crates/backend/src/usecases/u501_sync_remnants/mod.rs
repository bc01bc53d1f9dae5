pub mod catalog;
pub mod executor;
pub mod feed_source;
pub mod marketplace_api;
pub mod ozon_api_client;
pub mod price;
pub mod reconciler;
pub mod yandex_api_client;

pub use executor::SyncExecutor;
pub use feed_source::{FeedLayout, FeedSource, FileFeedSource, HttpFeedSource};
pub use marketplace_api::{CatalogPageSource, MarketplaceApi, UpdateSink};
pub use reconciler::OfferIdSet;
