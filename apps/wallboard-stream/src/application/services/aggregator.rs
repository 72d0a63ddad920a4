//! Snapshot Aggregator
//!
//! Builds a [`Snapshot`] from every category concurrently and derives the
//! market summary from the indices payload.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;

use super::FreshnessCache;
use crate::application::ports::{SnapshotError, SnapshotSource};
use crate::domain::market::{Category, MarketHours, MarketSummary, Snapshot};
use crate::infrastructure::metrics;

/// Composes category payloads into snapshots.
#[derive(Debug)]
pub struct SnapshotAggregator {
    cache: Arc<FreshnessCache>,
    hours: MarketHours,
}

impl SnapshotAggregator {
    /// Create an aggregator over `cache`.
    #[must_use]
    pub const fn new(cache: Arc<FreshnessCache>, hours: MarketHours) -> Self {
        Self { cache, hours }
    }

    /// Build a snapshot. Failing categories contribute empty or stale payloads.
    pub async fn build(&self) -> Snapshot {
        let started = Instant::now();

        let (indices, fx, rates, commodities, us_stocks, calendar) = tokio::join!(
            self.cache.get_or_fetch(Category::Indices),
            self.cache.get_or_fetch(Category::Fx),
            self.cache.get_or_fetch(Category::Rates),
            self.cache.get_or_fetch(Category::Commodities),
            self.cache.get_or_fetch(Category::UsStocks),
            self.cache.get_or_fetch(Category::Calendar),
        );

        let timestamp = Utc::now();
        let summary = MarketSummary::from_indices(&indices, self.hours.status_at(timestamp));

        metrics::record_snapshot_build(started.elapsed());
        tracing::debug!(
            total_indices = summary.total_indices,
            advancing = summary.advancing,
            declining = summary.declining,
            "Snapshot built"
        );

        Snapshot {
            timestamp,
            indices,
            fx,
            rates,
            commodities,
            us_stocks,
            calendar,
            summary,
        }
    }
}

#[async_trait]
impl SnapshotSource for SnapshotAggregator {
    async fn build_snapshot(&self) -> Result<Arc<Snapshot>, SnapshotError> {
        Ok(Arc::new(self.build().await))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rust_decimal::Decimal;

    use super::*;
    use crate::application::services::{CacheTtl, CategoryFetcher};
    use crate::domain::market::{Quote, QuoteTable};
    use crate::infrastructure::providers::FixtureProvider;

    fn aggregator(provider: &Arc<FixtureProvider>) -> SnapshotAggregator {
        let cache = FreshnessCache::new(
            CategoryFetcher::new(provider.clone()),
            None,
            CacheTtl::Disabled,
        );
        SnapshotAggregator::new(Arc::new(cache), MarketHours::default())
    }

    #[tokio::test]
    async fn summary_reflects_index_directions() {
        let provider = Arc::new(FixtureProvider::new());
        let now = Utc::now();
        let table: QuoteTable = [("A", 1), ("B", -1), ("C", 0)]
            .into_iter()
            .map(|(code, pct)| {
                let quote = Quote::new(code, Decimal::new(100, 0), now)
                    .with_change(Decimal::new(pct, 0), Decimal::new(pct, 0));
                (code.to_string(), quote)
            })
            .collect();
        provider.set_table(Category::Indices, table);

        let snapshot = aggregator(&provider).build().await;

        assert_eq!(snapshot.summary.advancing, 1);
        assert_eq!(snapshot.summary.declining, 1);
        assert_eq!(snapshot.summary.unchanged, 1);
        assert_eq!(snapshot.summary.total_indices, 3);
    }

    #[tokio::test]
    async fn failing_category_contributes_empty_payload() {
        let provider = Arc::new(FixtureProvider::with_sample_data());
        provider.fail(Category::Indices, true);

        let snapshot = aggregator(&provider).build().await;

        assert!(snapshot.indices.is_empty());
        assert_eq!(snapshot.summary.total_indices, 0);
        assert!(!snapshot.fx.is_empty());
        assert!(!snapshot.us_stocks.is_empty());
    }

    #[tokio::test]
    async fn timestamp_is_stamped_after_fetches() {
        let provider = Arc::new(FixtureProvider::with_sample_data());
        let snapshot = aggregator(&provider).build().await;

        for category in Category::ALL {
            if let Some(as_of) = snapshot.payload(category).as_of {
                assert!(snapshot.timestamp >= as_of);
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn categories_are_fetched_concurrently() {
        let provider = Arc::new(FixtureProvider::with_sample_data());
        provider.set_delay(Duration::from_millis(100));

        let started = tokio::time::Instant::now();
        aggregator(&provider).build().await;

        assert!(started.elapsed() < Duration::from_millis(200));
        for category in Category::ALL {
            assert_eq!(provider.calls(category), 1);
        }
    }

    #[tokio::test]
    async fn snapshot_source_never_fails() {
        let provider = Arc::new(FixtureProvider::new());
        for category in Category::ALL {
            provider.fail(category, true);
        }

        let snapshot = aggregator(&provider).build_snapshot().await.unwrap();
        assert_eq!(snapshot.summary.total_indices, 0);
    }
}
