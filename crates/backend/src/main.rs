pub mod shared;
pub mod system;
pub mod usecases;

use clap::Parser;
use contracts::enums::marketplace_type::MarketplaceType;
use contracts::usecases::common::UseCaseMetadata;
use contracts::usecases::u501_sync_remnants::{SyncMode, SyncRemnants};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use shared::config::{Config, ResolvedTarget, TargetConfig};
use shared::error::{SyncError, SyncResult};
use shared::format::format_number;
use usecases::u501_sync_remnants::ozon_api_client::OzonApiClient;
use usecases::u501_sync_remnants::yandex_api_client::YandexApiClient;
use usecases::u501_sync_remnants::{
    FeedSource, FileFeedSource, HttpFeedSource, MarketplaceApi, SyncExecutor,
};

/// Выгрузка остатков и цен из прайс-листа поставщика в OZON и Яндекс Маркет
#[derive(Parser, Debug)]
#[command(name = "remnants-sync", version, about, long_about = None)]
struct Cli {
    /// Путь к config.toml (по умолчанию рядом с исполняемым файлом)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Выгружать только в указанные цели (можно повторять)
    #[arg(long = "target", value_name = "NAME")]
    targets: Vec<String>,

    /// Что выгружать: all | stocks | prices
    #[arg(long, default_value = "all")]
    mode: SyncMode,

    /// Взять выгрузку остатков из локального файла (.xls, .xlsx, .csv или .zip)
    #[arg(long, value_name = "PATH")]
    feed_file: Option<PathBuf>,

    /// Собрать пакеты, но ничего не отправлять на площадки
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    system::tracing::initialize()?;
    let config = shared::config::load_config(cli.config.as_deref())?;

    tracing::info!(
        "Starting {} ({})",
        SyncRemnants::full_name(),
        SyncRemnants::display_name()
    );

    if let Err(e) = run(&cli, &config).await {
        tracing::error!("{}", e.user_message());
        tracing::debug!("Sync failed: {:?}", e);
        std::process::exit(1);
    }

    tracing::info!("{} finished", SyncRemnants::full_name());
    Ok(())
}

async fn run(cli: &Cli, config: &Config) -> SyncResult<()> {
    // Все переменные окружения проверяются до первого запроса к площадкам
    let targets = select_targets(&config.targets, &cli.targets)?
        .into_iter()
        .map(TargetConfig::resolve)
        .collect::<SyncResult<Vec<_>>>()?;

    if targets.is_empty() {
        tracing::warn!("No targets configured, nothing to do");
        return Ok(());
    }

    let feed = feed_source(cli, config)?;
    let rows = feed.fetch_feed_rows().await?;

    for resolved in targets {
        let api = build_api(&resolved, config.timeout())?;
        let executor = SyncExecutor::new(api, resolved.target).with_dry_run(cli.dry_run);
        let report = executor.run(&rows, cli.mode).await?;

        tracing::info!(
            "[{}] {}: остатков {} (ненулевых {}), цен {}{}",
            report.target,
            report.marketplace.display_name(),
            format_number(report.stocks.len()),
            format_number(report.non_empty_stocks.len()),
            format_number(report.prices.len()),
            if report.dry_run { " [dry-run]" } else { "" }
        );
    }

    Ok(())
}

/// Цели в порядке конфигурации; пустой фильтр означает "все"
fn select_targets<'a>(
    configured: &'a [TargetConfig],
    filter: &[String],
) -> SyncResult<Vec<&'a TargetConfig>> {
    if let Some(unknown) = filter
        .iter()
        .find(|name| !configured.iter().any(|t| &t.name == *name))
    {
        return Err(SyncError::Config(format!("unknown target '{}'", unknown)));
    }

    Ok(configured
        .iter()
        .filter(|t| filter.is_empty() || filter.contains(&t.name))
        .collect())
}

fn feed_source(cli: &Cli, config: &Config) -> SyncResult<Box<dyn FeedSource>> {
    let layout = config.feed.layout()?;

    let local = cli
        .feed_file
        .clone()
        .or_else(|| config.feed.path.clone().map(PathBuf::from));
    if let Some(path) = local {
        return Ok(Box::new(FileFeedSource::new(path, layout)));
    }

    let url = config
        .feed
        .url
        .clone()
        .ok_or_else(|| SyncError::Config("[feed] url is not set".to_string()))?;
    Ok(Box::new(HttpFeedSource::new(url, layout, config.timeout())?))
}

fn build_api(resolved: &ResolvedTarget, timeout: Duration) -> SyncResult<Arc<dyn MarketplaceApi>> {
    let api: Arc<dyn MarketplaceApi> = match resolved.target.marketplace {
        MarketplaceType::Ozon => Arc::new(OzonApiClient::new(
            &resolved.base_url,
            &resolved.account_id,
            &resolved.api_key,
            timeout,
        )?),
        MarketplaceType::YandexMarket => Arc::new(YandexApiClient::new(
            &resolved.base_url,
            &resolved.account_id,
            &resolved.api_key,
            timeout,
        )?),
    };
    Ok(api)
}
