//! Market Data Provider Port (Driven Port)
//!
//! One fetch operation per category. Providers report failures as
//! [`ProviderError`]; substitution of stale or empty data is left to the
//! freshness cache.

use async_trait::async_trait;

use crate::domain::market::{CalendarEvent, QuoteTable};

/// Upstream source of category data.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Provider name for logs and health output.
    fn name(&self) -> &'static str;

    /// Equity indices.
    async fn fetch_indices(&self) -> Result<QuoteTable, ProviderError>;

    /// FX rates.
    async fn fetch_fx(&self) -> Result<QuoteTable, ProviderError>;

    /// Interest rates and bond yields.
    async fn fetch_rates(&self) -> Result<QuoteTable, ProviderError>;

    /// Commodity futures.
    async fn fetch_commodities(&self) -> Result<QuoteTable, ProviderError>;

    /// US indices and stocks.
    async fn fetch_us_stocks(&self) -> Result<QuoteTable, ProviderError>;

    /// Economic calendar, ordered by date.
    async fn fetch_calendar(&self) -> Result<Vec<CalendarEvent>, ProviderError>;
}

/// Provider fetch error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Provider could not be reached.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Provider did not answer in time.
    #[error("provider timed out after {timeout_secs} seconds")]
    Timeout {
        /// Elapsed timeout.
        timeout_secs: u64,
    },

    /// Provider answered with data that could not be mapped.
    #[error("invalid provider response: {message}")]
    InvalidResponse {
        /// Error details.
        message: String,
    },
}

impl ProviderError {
    /// Short label for metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable { .. } => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }
}
