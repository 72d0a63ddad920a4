use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix of persistent cache keys.
const CACHE_KEY_PREFIX: &str = "market_data";

/// A class of market data fetched and cached as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Equity indices.
    Indices,
    /// Foreign exchange rates.
    Fx,
    /// Interest rates and bond yields.
    Rates,
    /// Commodity futures.
    Commodities,
    /// US indices and large-cap stocks.
    UsStocks,
    /// Economic calendar events.
    Calendar,
}

impl Category {
    /// Number of categories.
    pub const COUNT: usize = 6;

    /// Every category, in snapshot field order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Indices,
        Self::Fx,
        Self::Rates,
        Self::Commodities,
        Self::UsStocks,
        Self::Calendar,
    ];

    /// Wire and metric name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Indices => "indices",
            Self::Fx => "fx",
            Self::Rates => "rates",
            Self::Commodities => "commodities",
            Self::UsStocks => "us_stocks",
            Self::Calendar => "calendar",
        }
    }

    /// Position in [`Category::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Indices => 0,
            Self::Fx => 1,
            Self::Rates => 2,
            Self::Commodities => 3,
            Self::UsStocks => 4,
            Self::Calendar => 5,
        }
    }

    /// Parse a category name, accepting `us-stocks` as well as `us_stocks`.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "indices" => Some(Self::Indices),
            "fx" => Some(Self::Fx),
            "rates" => Some(Self::Rates),
            "commodities" => Some(Self::Commodities),
            "us_stocks" => Some(Self::UsStocks),
            "calendar" => Some(Self::Calendar),
            _ => None,
        }
    }

    /// Key under which this category is stored in the persistent cache.
    #[must_use]
    pub fn cache_key(self) -> String {
        format!("{CACHE_KEY_PREFIX}:{}", self.as_str())
    }

    /// Whether the payload is an event list rather than a quote table.
    #[must_use]
    pub const fn is_event_list(self) -> bool {
        matches!(self, Self::Calendar)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
