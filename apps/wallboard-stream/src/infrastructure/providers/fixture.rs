use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::ports::{MarketDataProvider, ProviderError};
use crate::domain::market::{CalendarEvent, Category, EventImportance, Quote, QuoteTable};

/// Provider serving scripted tables.
///
/// Failures and latency can be switched on per category, and every call
/// is counted, which makes it the provider of choice for exercising the
/// cache and broadcast paths.
#[derive(Debug, Default)]
pub struct FixtureProvider {
    tables: Mutex<[QuoteTable; Category::COUNT]>,
    events: Mutex<Vec<CalendarEvent>>,
    failing: Mutex<HashSet<Category>>,
    delay: Mutex<Option<Duration>>,
    calls: [AtomicUsize; Category::COUNT],
}

impl FixtureProvider {
    /// Provider with every category empty.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider with two quotes per price category and one calendar event.
    #[must_use]
    pub fn with_sample_data() -> Self {
        let provider = Self::new();
        let now = Utc::now();
        let sample = [
            (Category::Indices, [("000001.SH", 315_012, 45), ("399005.SZ", 850_000, -12)]),
            (Category::Fx, [("USDCNY.EX", 72_512, 3), ("EURCNY.EX", 78_420, -8)]),
            (Category::Rates, [("M0000017.SH", 285, 0), ("M0000001.SH", 225, -4)]),
            (Category::Commodities, [("CU00.SHF", 6_850_000, 110), ("AU00.SHF", 46_500, -35)]),
            (Category::UsStocks, [("SPX.GI", 450_000, 62), ("AAPL.O", 18_000, -140)]),
        ];
        for (category, quotes) in sample {
            let table = quotes
                .into_iter()
                .map(|(code, last, pct)| {
                    let quote = Quote::new(code, Decimal::new(last, 2), now)
                        .with_change(Decimal::new(last * pct, 6), Decimal::new(pct, 2));
                    (code.to_string(), quote)
                })
                .collect();
            provider.set_table(category, table);
        }
        provider.set_events(vec![CalendarEvent {
            date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap_or_default(),
            time: Some("09:30".to_string()),
            country: "CN".to_string(),
            event: "CPI YoY".to_string(),
            importance: EventImportance::High,
            forecast: None,
            previous: Some("0.7%".to_string()),
        }]);
        provider
    }

    /// Replace the quote table served for `category`.
    pub fn set_table(&self, category: Category, table: QuoteTable) {
        self.tables.lock()[category.index()] = table;
    }

    /// Quote table currently served for `category`.
    #[must_use]
    pub fn table(&self, category: Category) -> QuoteTable {
        self.tables.lock()[category.index()].clone()
    }

    /// Replace the calendar events.
    pub fn set_events(&self, events: Vec<CalendarEvent>) {
        *self.events.lock() = events;
    }

    /// Make fetches of `category` fail or succeed.
    pub fn fail(&self, category: Category, failing: bool) {
        let mut set = self.failing.lock();
        if failing {
            set.insert(category);
        } else {
            set.remove(&category);
        }
    }

    /// Delay every fetch by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Number of fetches made for `category`.
    #[must_use]
    pub fn calls(&self, category: Category) -> usize {
        self.calls[category.index()].load(Ordering::SeqCst)
    }

    async fn begin(&self, category: Category) -> Result<(), ProviderError> {
        self.calls[category.index()].fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().contains(&category) {
            return Err(ProviderError::Unavailable {
                message: format!("fixture failure for {category}"),
            });
        }
        Ok(())
    }

    async fn quotes(&self, category: Category) -> Result<QuoteTable, ProviderError> {
        self.begin(category).await?;
        Ok(self.table(category))
    }
}

#[async_trait]
impl MarketDataProvider for FixtureProvider {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn fetch_indices(&self) -> Result<QuoteTable, ProviderError> {
        self.quotes(Category::Indices).await
    }

    async fn fetch_fx(&self) -> Result<QuoteTable, ProviderError> {
        self.quotes(Category::Fx).await
    }

    async fn fetch_rates(&self) -> Result<QuoteTable, ProviderError> {
        self.quotes(Category::Rates).await
    }

    async fn fetch_commodities(&self) -> Result<QuoteTable, ProviderError> {
        self.quotes(Category::Commodities).await
    }

    async fn fetch_us_stocks(&self) -> Result<QuoteTable, ProviderError> {
        self.quotes(Category::UsStocks).await
    }

    async fn fetch_calendar(&self) -> Result<Vec<CalendarEvent>, ProviderError> {
        self.begin(Category::Calendar).await?;
        Ok(self.events.lock().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_calls_and_injects_failures() {
        let provider = FixtureProvider::with_sample_data();
        assert_eq!(provider.fetch_fx().await.unwrap().len(), 2);

        provider.fail(Category::Fx, true);
        assert!(matches!(
            provider.fetch_fx().await,
            Err(ProviderError::Unavailable { .. })
        ));

        provider.fail(Category::Fx, false);
        assert!(provider.fetch_fx().await.is_ok());
        assert_eq!(provider.calls(Category::Fx), 3);
        assert_eq!(provider.calls(Category::Rates), 0);
    }

    #[tokio::test]
    async fn empty_fixture_serves_empty_tables() {
        let provider = FixtureProvider::new();
        assert!(provider.fetch_indices().await.unwrap().is_empty());
        assert!(provider.fetch_calendar().await.unwrap().is_empty());
    }
}
