//! Category Fetcher Adapter
//!
//! Maps a [`Category`] to the matching provider operation and stamps the
//! result with its fetch time.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::application::ports::{MarketDataProvider, ProviderError};
use crate::domain::market::{Category, CategoryPayload, QuoteTable};
use crate::infrastructure::metrics::{self, FetchOutcome};

/// Typed front for a [`MarketDataProvider`].
#[derive(Clone)]
pub struct CategoryFetcher {
    provider: Arc<dyn MarketDataProvider>,
}

impl CategoryFetcher {
    /// Wrap a provider.
    #[must_use]
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// Name of the wrapped provider.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Fetch one category from the provider.
    ///
    /// # Errors
    ///
    /// Propagates the provider's error unchanged.
    pub async fn fetch(&self, category: Category) -> Result<CategoryPayload, ProviderError> {
        let started = Instant::now();
        let result = match category {
            Category::Indices => self.provider.fetch_indices().await.map(quotes),
            Category::Fx => self.provider.fetch_fx().await.map(quotes),
            Category::Rates => self.provider.fetch_rates().await.map(quotes),
            Category::Commodities => self.provider.fetch_commodities().await.map(quotes),
            Category::UsStocks => self.provider.fetch_us_stocks().await.map(quotes),
            Category::Calendar => self
                .provider
                .fetch_calendar()
                .await
                .map(|events| CategoryPayload::events(Utc::now(), events)),
        };

        let outcome = if result.is_ok() {
            FetchOutcome::Success
        } else {
            FetchOutcome::Failure
        };
        metrics::record_category_fetch(category, outcome, started.elapsed());

        result
    }
}

fn quotes(table: QuoteTable) -> CategoryPayload {
    CategoryPayload::quotes(Utc::now(), table)
}

impl std::fmt::Debug for CategoryFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategoryFetcher")
            .field("provider", &self.provider.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::providers::{DemoProvider, NullProvider};

    #[tokio::test]
    async fn stamps_fetch_time() {
        let fetcher = CategoryFetcher::new(Arc::new(DemoProvider::new()));
        let before = Utc::now();
        let payload = fetcher.fetch(Category::Fx).await.unwrap();

        assert!(payload.as_of.unwrap() >= before);
        assert!(!payload.is_empty());
    }

    #[tokio::test]
    async fn calendar_maps_to_event_payload() {
        let fetcher = CategoryFetcher::new(Arc::new(NullProvider));
        let payload = fetcher.fetch(Category::Calendar).await.unwrap();

        assert!(payload.quote_table().is_none());
        assert!(payload.is_empty());
        assert!(payload.as_of.is_some());
    }

    #[test]
    fn debug_names_provider() {
        let fetcher = CategoryFetcher::new(Arc::new(NullProvider));
        assert_eq!(fetcher.provider_name(), "null");
        assert!(format!("{fetcher:?}").contains("null"));
    }
}
