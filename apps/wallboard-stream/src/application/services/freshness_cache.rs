//! Freshness Cache
//!
//! Per-category cache-aside in front of the [`CategoryFetcher`].
//!
//! A category's in-memory [`FreshnessRecord`] decides whether cached data
//! may be reused. While the record is within TTL the persistent store is
//! consulted first, then the in-memory payload. Otherwise the provider is
//! called; a success refreshes the record and writes the store, a failure
//! falls back to the last good payload or an empty one.
//!
//! An empty successful fetch keeps the last good payload for failure
//! fallback, but the category reads as empty until the window expires.
//!
//! Each category is guarded by its own async mutex, so at most one
//! upstream fetch per category is in flight. Callers queued behind a
//! successful fetch find a fresh record and reuse its result.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use super::CategoryFetcher;
use crate::application::ports::CacheStore;
use crate::domain::market::{Category, CategoryPayload};
use crate::infrastructure::metrics::{self, CacheLookup, StoreOperation};

/// Process-wide cache lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    /// Always fetch; never read or write the store.
    Disabled,
    /// Reuse data younger than this.
    Enabled(Duration),
}

impl CacheTtl {
    /// TTL from signed seconds; zero or negative disables caching.
    #[must_use]
    pub fn from_secs(secs: i64) -> Self {
        u64::try_from(secs)
            .ok()
            .filter(|s| *s > 0)
            .map_or(Self::Disabled, |s| Self::Enabled(Duration::from_secs(s)))
    }

    /// TTL duration, if enabled.
    #[must_use]
    pub const fn duration(self) -> Option<Duration> {
        match self {
            Self::Disabled => None,
            Self::Enabled(ttl) => Some(ttl),
        }
    }
}

/// In-memory freshness state for one category.
#[derive(Debug, Clone, Default)]
pub struct FreshnessRecord {
    /// Time of the last successful fetch.
    pub last_fetched_at: Option<Instant>,
    /// Last non-empty payload from a successful fetch.
    pub cached_payload: Option<CategoryPayload>,
    /// Whether the last successful fetch returned no data.
    pub fetched_empty: bool,
}

impl FreshnessRecord {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        self.last_fetched_at
            .is_some_and(|fetched| now.saturating_duration_since(fetched) < ttl)
    }
}

/// Cache-aside over all categories.
pub struct FreshnessCache {
    fetcher: CategoryFetcher,
    store: Option<Arc<dyn CacheStore>>,
    ttl: CacheTtl,
    records: [Mutex<FreshnessRecord>; Category::COUNT],
}

impl FreshnessCache {
    /// Create a cache over `fetcher`, optionally backed by a persistent store.
    #[must_use]
    pub fn new(fetcher: CategoryFetcher, store: Option<Arc<dyn CacheStore>>, ttl: CacheTtl) -> Self {
        Self {
            fetcher,
            store,
            ttl,
            records: std::array::from_fn(|_| Mutex::new(FreshnessRecord::default())),
        }
    }

    /// Configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> CacheTtl {
        self.ttl
    }

    /// Copy of the current record for `category`.
    pub async fn record(&self, category: Category) -> FreshnessRecord {
        self.records[category.index()].lock().await.clone()
    }

    /// Return a payload for `category`. Never fails.
    #[tracing::instrument(skip_all, fields(category = %category))]
    pub async fn get_or_fetch(&self, category: Category) -> CategoryPayload {
        let mut record = self.records[category.index()].lock().await;

        match self.ttl {
            CacheTtl::Enabled(ttl) if record.is_fresh(ttl, Instant::now()) => {
                if record.fetched_empty {
                    metrics::record_cache_lookup(category, CacheLookup::MemoryHit);
                    return CategoryPayload::empty(category);
                }
                if let Some(payload) = self.read_store(category).await {
                    metrics::record_cache_lookup(category, CacheLookup::StoreHit);
                    return payload;
                }
                if let Some(payload) = record.cached_payload.clone() {
                    metrics::record_cache_lookup(category, CacheLookup::MemoryHit);
                    return payload;
                }
                metrics::record_cache_lookup(category, CacheLookup::Miss);
            }
            CacheTtl::Enabled(_) => metrics::record_cache_lookup(category, CacheLookup::Miss),
            CacheTtl::Disabled => metrics::record_cache_lookup(category, CacheLookup::Bypass),
        }

        match self.fetcher.fetch(category).await {
            Ok(payload) => {
                record.last_fetched_at = Some(Instant::now());
                record.fetched_empty = payload.is_empty();
                if !payload.is_empty() {
                    record.cached_payload = Some(payload.clone());
                    if let CacheTtl::Enabled(ttl) = self.ttl {
                        self.write_store(category, &payload, ttl).await;
                    }
                }
                payload
            }
            Err(e) => {
                let stale = record.cached_payload.clone();
                tracing::warn!(
                    provider = self.fetcher.provider_name(),
                    error = %e,
                    stale = stale.is_some(),
                    "Category fetch failed"
                );
                stale.unwrap_or_else(|| CategoryPayload::empty(category))
            }
        }
    }

    async fn read_store(&self, category: Category) -> Option<CategoryPayload> {
        let store = self.store.as_ref()?;
        let text = match store.get(&category.cache_key()).await {
            Ok(text) => text?,
            Err(e) => {
                metrics::record_cache_store_error(StoreOperation::Get);
                tracing::warn!(store = store.name(), error = %e, "Cache store read failed");
                return None;
            }
        };

        match serde_json::from_str::<CategoryPayload>(&text) {
            Ok(payload)
                if !payload.is_empty()
                    && payload.quote_table().is_some() != category.is_event_list() =>
            {
                Some(payload)
            }
            Ok(_) => None,
            Err(e) => {
                metrics::record_cache_store_error(StoreOperation::Decode);
                tracing::warn!(store = store.name(), error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn write_store(&self, category: Category, payload: &CategoryPayload, ttl: Duration) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let text = match serde_json::to_string(payload) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode payload for cache store");
                return;
            }
        };
        if let Err(e) = store.set(&category.cache_key(), &text, ttl).await {
            metrics::record_cache_store_error(StoreOperation::Set);
            tracing::warn!(store = store.name(), error = %e, "Cache store write failed");
        }
    }
}

impl std::fmt::Debug for FreshnessCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreshnessCache")
            .field("fetcher", &self.fetcher)
            .field("store", &self.store.as_ref().map(|s| s.name()))
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
