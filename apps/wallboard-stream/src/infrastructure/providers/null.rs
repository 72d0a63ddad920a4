use async_trait::async_trait;

use crate::application::ports::{MarketDataProvider, ProviderError};
use crate::domain::market::{CalendarEvent, QuoteTable};

/// Provider with no data source; every category is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullProvider;

#[async_trait]
impl MarketDataProvider for NullProvider {
    fn name(&self) -> &'static str {
        "null"
    }

    async fn fetch_indices(&self) -> Result<QuoteTable, ProviderError> {
        Ok(QuoteTable::new())
    }

    async fn fetch_fx(&self) -> Result<QuoteTable, ProviderError> {
        Ok(QuoteTable::new())
    }

    async fn fetch_rates(&self) -> Result<QuoteTable, ProviderError> {
        Ok(QuoteTable::new())
    }

    async fn fetch_commodities(&self) -> Result<QuoteTable, ProviderError> {
        Ok(QuoteTable::new())
    }

    async fn fetch_us_stocks(&self) -> Result<QuoteTable, ProviderError> {
        Ok(QuoteTable::new())
    }

    async fn fetch_calendar(&self) -> Result<Vec<CalendarEvent>, ProviderError> {
        Ok(Vec::new())
    }
}
