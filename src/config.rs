//! User configuration
//!
//! Read from `<config_home>/goldtrack/config.toml`. Every key is optional, and
//! a few environment variables override the file so the CLI can be pointed at
//! a scratch database or an offline price without editing it.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::TrackerError;
use crate::pricing::{
    goldapi, FixedPriceFeed, GoldApiFeed, PriceCache, PriceFeed, PriceService,
    DEFAULT_TTL_MINUTES,
};

pub const ENV_DB: &str = "GOLDTRACK_DB";
pub const ENV_API_KEY: &str = "GOLDTRACK_API_KEY";
pub const ENV_FIXED_PRICE: &str = "GOLDTRACK_FIXED_PRICE";

/// Longest accepted price cache TTL (one week)
pub const MAX_CACHE_TTL_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub user_id: i64,
    pub database_path: Option<PathBuf>,
    pub price: PriceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PriceConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub cache_ttl_minutes: i64,
    /// When set, no network feed is used
    pub fixed_price_per_gram: Option<Decimal>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: 1,
            database_path: None,
            price: PriceConfig::default(),
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            api_url: goldapi::DEFAULT_API_URL.to_string(),
            api_key: None,
            cache_ttl_minutes: DEFAULT_TTL_MINUTES,
            fixed_price_per_gram: None,
        }
    }
}

fn config_error(msg: impl Into<String>) -> anyhow::Error {
    TrackerError::Config(msg.into()).into()
}

pub fn default_config_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("goldtrack").join("config.toml"))
}

impl Config {
    /// Load the config file (default location when `path` is None), then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => default_config_path(),
        };

        let mut config = match path {
            Some(ref p) if p.exists() => {
                let contents = std::fs::read_to_string(p)
                    .with_context(|| format!("Failed to read config file {}", p.display()))?;
                Self::from_toml_str(&contents)
                    .with_context(|| format!("Invalid config file {}", p.display()))?
            }
            _ => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| config_error(e.to_string()))
    }

    /// Apply overrides from an environment-like lookup; empty values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(db) = get(ENV_DB) {
            self.database_path = Some(PathBuf::from(db));
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.price.api_key = Some(key);
        }
        if let Some(raw) = get(ENV_FIXED_PRICE) {
            let price = Decimal::from_str(raw.trim()).map_err(|_| {
                config_error(format!(
                    "{} must be a decimal number, got {:?}",
                    ENV_FIXED_PRICE, raw
                ))
            })?;
            self.price.fixed_price_per_gram = Some(price);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id <= 0 {
            return Err(config_error("user_id must be positive"));
        }
        self.cache_ttl()?;
        if let Some(price) = self.price.fixed_price_per_gram {
            if price <= Decimal::ZERO {
                return Err(config_error("price.fixed_price_per_gram must be positive"));
            }
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Result<chrono::Duration> {
        let minutes = self.price.cache_ttl_minutes;
        if !(1..=MAX_CACHE_TTL_MINUTES).contains(&minutes) {
            return Err(config_error(format!(
                "price.cache_ttl_minutes must be between 1 and {}, got {}",
                MAX_CACHE_TTL_MINUTES, minutes
            )));
        }
        chrono::Duration::try_minutes(minutes)
            .ok_or_else(|| config_error("price.cache_ttl_minutes is out of range"))
    }

    /// Build the configured price feed: a fixed price if one is set,
    /// otherwise GoldAPI, which needs an API key.
    pub fn price_feed(&self) -> Result<Arc<dyn PriceFeed>> {
        if let Some(price) = self.price.fixed_price_per_gram {
            return Ok(Arc::new(FixedPriceFeed::new(price)));
        }

        let api_key = self.price.api_key.as_deref().ok_or_else(|| {
            config_error(format!(
                "no price source configured; set price.api_key in the config file or {}",
                ENV_API_KEY
            ))
        })?;
        Ok(Arc::new(GoldApiFeed::new(&self.price.api_url, api_key)?))
    }

    pub fn price_service(&self) -> Result<PriceService> {
        let cache = Arc::new(PriceCache::with_ttl(self.cache_ttl()?));
        Ok(PriceService::new(cache, self.price_feed()?))
    }
}
