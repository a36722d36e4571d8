// Pricing module - gold spot price feed and single-slot cache

pub mod goldapi;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use crate::error::TrackerError;
use crate::utils::round_money;

pub use goldapi::GoldApiFeed;

/// Default time a quote stays fresh
pub const DEFAULT_TTL_MINUTES: i64 = 60;

/// Spot price of one gram of gold in USD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price_per_gram_usd: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl PriceQuote {
    /// Build a quote rounded to cents; the price must be positive
    pub fn new(price_per_gram_usd: Decimal, timestamp: DateTime<Utc>) -> Result<Self> {
        let price_per_gram_usd = round_money(price_per_gram_usd);
        if price_per_gram_usd <= Decimal::ZERO {
            return Err(TrackerError::Upstream(format!(
                "price feed returned non-positive price {}",
                price_per_gram_usd
            ))
            .into());
        }
        Ok(Self {
            price_per_gram_usd,
            timestamp,
        })
    }
}

/// Source of spot prices. Failures are returned to the caller, never retried here.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    async fn fetch_spot_price(&self) -> Result<PriceQuote>;
}

/// Feed that always answers with the same price (offline use)
#[derive(Debug, Clone)]
pub struct FixedPriceFeed {
    price_per_gram_usd: Decimal,
}

impl FixedPriceFeed {
    pub fn new(price_per_gram_usd: Decimal) -> Self {
        Self { price_per_gram_usd }
    }
}

#[async_trait]
impl PriceFeed for FixedPriceFeed {
    async fn fetch_spot_price(&self) -> Result<PriceQuote> {
        PriceQuote::new(self.price_per_gram_usd, Utc::now())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    quote: PriceQuote,
    expires_at: DateTime<Utc>,
}

/// Single-slot price cache with a fixed TTL.
///
/// One instance is meant to be shared (behind an `Arc`) by everything in the
/// process that needs the price. Misses in `get_or_fetch` are coalesced: one
/// caller fetches while the others wait and then read the stored quote.
pub struct PriceCache {
    slot: Mutex<Option<CacheEntry>>,
    fetch_gate: tokio::sync::Mutex<()>,
    ttl: Duration,
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceCache {
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(DEFAULT_TTL_MINUTES))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            fetch_gate: tokio::sync::Mutex::new(()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<CacheEntry>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached quote if still fresh; a stale entry is evicted
    pub fn get(&self) -> Option<PriceQuote> {
        self.get_at(Utc::now())
    }

    fn get_at(&self, now: DateTime<Utc>) -> Option<PriceQuote> {
        let mut slot = self.lock_slot();
        match slot.as_ref() {
            Some(entry) if now <= entry.expires_at => Some(entry.quote.clone()),
            Some(_) => {
                debug!("Evicting stale gold price");
                *slot = None;
                None
            }
            None => None,
        }
    }

    /// Replace the slot with `quote`, fresh for one TTL from now
    pub fn put(&self, quote: PriceQuote) {
        self.put_at(quote, Utc::now());
    }

    fn put_at(&self, quote: PriceQuote, now: DateTime<Utc>) {
        let mut slot = self.lock_slot();
        *slot = Some(CacheEntry {
            quote,
            expires_at: now
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        });
    }

    pub fn invalidate(&self) {
        *self.lock_slot() = None;
        info!("Gold price cache cleared");
    }

    pub fn is_valid(&self) -> bool {
        self.get().is_some()
    }

    /// Cached quote, or a fresh one from `feed` stored for later calls
    pub async fn get_or_fetch(&self, feed: &dyn PriceFeed) -> Result<PriceQuote> {
        if let Some(quote) = self.get() {
            debug!("Using cached gold price {}", quote.price_per_gram_usd);
            return Ok(quote);
        }

        let _gate = self.fetch_gate.lock().await;
        // Another caller may have filled the slot while we waited
        if let Some(quote) = self.get() {
            return Ok(quote);
        }

        self.fetch_and_store(feed).await
    }

    /// Fetch from `feed` regardless of the slot, then store the result
    pub async fn refresh(&self, feed: &dyn PriceFeed) -> Result<PriceQuote> {
        let _gate = self.fetch_gate.lock().await;
        self.fetch_and_store(feed).await
    }

    async fn fetch_and_store(&self, feed: &dyn PriceFeed) -> Result<PriceQuote> {
        info!("Fetching fresh gold spot price");
        let quote = feed
            .fetch_spot_price()
            .await
            .context("Gold price fetch failed")?;
        self.put(quote.clone());
        Ok(quote)
    }
}

/// Price lookups for the rest of the application: a feed plus the shared cache
#[derive(Clone)]
pub struct PriceService {
    cache: Arc<PriceCache>,
    feed: Arc<dyn PriceFeed>,
}

impl PriceService {
    pub fn new(cache: Arc<PriceCache>, feed: Arc<dyn PriceFeed>) -> Self {
        Self { cache, feed }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// Cached price when fresh, otherwise fetched
    pub async fn current(&self) -> Result<PriceQuote> {
        self.cache.get_or_fetch(self.feed.as_ref()).await
    }

    /// Straight from the feed; the cache is neither read nor written
    pub async fn fresh(&self) -> Result<PriceQuote> {
        self.feed
            .fetch_spot_price()
            .await
            .context("Gold price fetch failed")
    }

    /// Fetch again and replace the cached price
    pub async fn refresh(&self) -> Result<PriceQuote> {
        self.cache.refresh(self.feed.as_ref()).await
    }
}
