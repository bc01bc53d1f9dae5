use contracts::enums::marketplace_type::MarketplaceType;
use contracts::usecases::u501_sync_remnants::{BatchLimits, SyncTarget};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::error::{SyncError, SyncResult};
use crate::usecases::u501_sync_remnants::feed_source::FeedLayout;
use crate::usecases::u501_sync_remnants::ozon_api_client::OZON_BASE_URL;
use crate::usecases::u501_sync_remnants::yandex_api_client::YANDEX_BASE_URL;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub feed: FeedConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    /// Адрес архива с остатками
    pub url: Option<String>,
    /// Локальная выгрузка (имеет приоритет над url)
    pub path: Option<String>,
    #[serde(default = "default_entry")]
    pub entry: Option<String>,
    /// Строка заголовка на листе (с нуля); без ключа ищется по названиям колонок
    pub header_row: Option<usize>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    #[serde(default = "default_code_column")]
    pub code_column: String,
    #[serde(default = "default_quantity_column")]
    pub quantity_column: String,
    #[serde(default = "default_price_column")]
    pub price_column: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Одна цель выгрузки. Секреты в файле не хранятся: указываются имена переменных окружения
#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub name: String,
    /// Код площадки: "mp-ozon" или "mp-ym"
    pub marketplace: String,
    /// Client-Id для OZON, ID кампании для Маркета
    pub account_id_env: String,
    pub api_key_env: String,
    pub warehouse_id_env: Option<String>,
    pub stock_batch_limit: Option<usize>,
    pub price_batch_limit: Option<usize>,
    pub base_url: Option<String>,
}

/// Цель с подставленными значениями из окружения
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub target: SyncTarget,
    pub account_id: String,
    pub api_key: String,
    pub base_url: String,
}

fn default_entry() -> Option<String> {
    Some("ostatki.xls".to_string())
}

fn default_delimiter() -> String {
    ";".to_string()
}

fn default_code_column() -> String {
    "Код".to_string()
}

fn default_quantity_column() -> String {
    "Количество".to_string()
}

fn default_price_column() -> String {
    "Цена".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[feed]
url = "https://timeworld.ru/upload/files/ostatki.zip"
entry = "ostatki.xls"
header_row = 17

[http]
timeout_secs = 30

[[targets]]
name = "ozon"
marketplace = "mp-ozon"
account_id_env = "CLIENT_ID"
api_key_env = "SELLER_TOKEN"

[[targets]]
name = "ym-fbs"
marketplace = "mp-ym"
account_id_env = "FBS_ID"
api_key_env = "MARKET_TOKEN"
warehouse_id_env = "WAREHOUSE_FBS_ID"

[[targets]]
name = "ym-dbs"
marketplace = "mp-ym"
account_id_env = "DBS_ID"
api_key_env = "MARKET_TOKEN"
warehouse_id_env = "WAREHOUSE_DBS_ID"
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Explicit path (command line)
/// 2. Next to the executable (for production)
/// 3. Falls back to embedded default config
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        tracing::info!("Loading config from: {}", path.display());
        return parse_config_file(path);
    }

    if let Some(config_path) = exe_dir().map(|dir| dir.join("config.toml")) {
        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            return parse_config_file(&config_path);
        }
        tracing::warn!("config.toml not found at: {}", config_path.display());
    }

    tracing::info!("Using default embedded configuration");
    let config = parse_config(DEFAULT_CONFIG)?;
    Ok(config)
}

fn parse_config_file(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {}: {}", path.display(), e))?;
    Ok(parse_config(&contents)?)
}

pub fn parse_config(contents: &str) -> SyncResult<Config> {
    let config: Config =
        toml::from_str(contents).map_err(|e| SyncError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

impl Config {
    pub fn validate(&self) -> SyncResult<()> {
        if self.feed.url.is_none() && self.feed.path.is_none() {
            return Err(SyncError::Config(
                "[feed] needs either 'url' or 'path'".to_string(),
            ));
        }
        self.feed.delimiter_byte()?;

        if self.http.timeout_secs == 0 {
            return Err(SyncError::Config(
                "[http] timeout_secs must be greater than zero".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for target in &self.targets {
            if target.name.trim().is_empty() {
                return Err(SyncError::Config("target name cannot be empty".to_string()));
            }
            if !names.insert(target.name.as_str()) {
                return Err(SyncError::Config(format!(
                    "duplicate target name '{}'",
                    target.name
                )));
            }
            let marketplace = target.marketplace_type()?;
            if target.stock_batch_limit == Some(0) || target.price_batch_limit == Some(0) {
                return Err(SyncError::Config(format!(
                    "target '{}': batch limits must be greater than zero",
                    target.name
                )));
            }
            if marketplace == MarketplaceType::YandexMarket && target.warehouse_id_env.is_none() {
                return Err(SyncError::Config(format!(
                    "target '{}': warehouse_id_env is required for {}",
                    target.name,
                    marketplace.display_name()
                )));
            }
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

impl FeedConfig {
    pub fn delimiter_byte(&self) -> SyncResult<u8> {
        match self.delimiter.as_bytes() {
            [b] if b.is_ascii() => Ok(*b),
            _ => Err(SyncError::Config(format!(
                "[feed] delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            ))),
        }
    }

    pub fn layout(&self) -> SyncResult<FeedLayout> {
        Ok(FeedLayout {
            entry: self.entry.clone().filter(|e| !e.trim().is_empty()),
            header_row: self.header_row,
            delimiter: self.delimiter_byte()?,
            code_column: self.code_column.clone(),
            quantity_column: self.quantity_column.clone(),
            price_column: self.price_column.clone(),
        })
    }
}

impl TargetConfig {
    pub fn marketplace_type(&self) -> SyncResult<MarketplaceType> {
        MarketplaceType::from_code(&self.marketplace).ok_or_else(|| {
            SyncError::Config(format!(
                "target '{}': unknown marketplace '{}'",
                self.name, self.marketplace
            ))
        })
    }

    /// Подставить значения из переменных окружения процесса
    pub fn resolve(&self) -> SyncResult<ResolvedTarget> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> SyncResult<ResolvedTarget> {
        let require = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    SyncError::Config(format!(
                        "target '{}': environment variable {} is not set",
                        self.name, var
                    ))
                })
        };

        let marketplace = self.marketplace_type()?;
        let defaults = marketplace.default_batch_limits();
        let limits = BatchLimits {
            stock: self.stock_batch_limit.unwrap_or(defaults.stock),
            price: self.price_batch_limit.unwrap_or(defaults.price),
        };

        let mut target = SyncTarget::new(self.name.clone(), marketplace).with_limits(limits);
        if let Some(var) = &self.warehouse_id_env {
            let warehouse_id = require(var.as_str())?;
            if marketplace == MarketplaceType::Ozon && warehouse_id.parse::<i64>().is_err() {
                return Err(SyncError::Config(format!(
                    "target '{}': OZON warehouse id in {} must be numeric",
                    self.name, var
                )));
            }
            target = target.with_warehouse(warehouse_id);
        }

        let base_url = self.base_url.clone().unwrap_or_else(|| {
            match marketplace {
                MarketplaceType::Ozon => OZON_BASE_URL,
                MarketplaceType::YandexMarket => YANDEX_BASE_URL,
            }
            .to_string()
        });

        Ok(ResolvedTarget {
            target,
            account_id: require(self.account_id_env.as_str())?,
            api_key: require(self.api_key_env.as_str())?,
            base_url,
        })
    }
}
