use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Category;

/// Quotes keyed by instrument code (e.g. `000001.SH`).
pub type QuoteTable = BTreeMap<String, Quote>;

/// Latest quote for a single instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Instrument code.
    pub code: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Last traded price or level.
    pub last: Decimal,
    /// Absolute change versus previous close.
    #[serde(default)]
    pub change: Option<Decimal>,
    /// Percentage change versus previous close.
    #[serde(default)]
    pub change_pct: Option<Decimal>,
    /// Session open.
    #[serde(default)]
    pub open: Option<Decimal>,
    /// Session high.
    #[serde(default)]
    pub high: Option<Decimal>,
    /// Session low.
    #[serde(default)]
    pub low: Option<Decimal>,
    /// Previous close.
    #[serde(default)]
    pub prev_close: Option<Decimal>,
    /// Traded volume.
    #[serde(default)]
    pub volume: Option<Decimal>,
    /// Traded amount (turnover).
    #[serde(default)]
    pub amount: Option<Decimal>,
    /// Quote time.
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Create a quote carrying only a last price.
    #[must_use]
    pub fn new(code: impl Into<String>, last: Decimal, timestamp: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            name: None,
            last,
            change: None,
            change_pct: None,
            open: None,
            high: None,
            low: None,
            prev_close: None,
            volume: None,
            amount: None,
            timestamp,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set absolute and percentage change.
    #[must_use]
    pub const fn with_change(mut self, change: Decimal, change_pct: Decimal) -> Self {
        self.change = Some(change);
        self.change_pct = Some(change_pct);
        self
    }

    /// Set open, high, low and previous close.
    #[must_use]
    pub const fn with_range(
        mut self,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        prev_close: Decimal,
    ) -> Self {
        self.open = Some(open);
        self.high = Some(high);
        self.low = Some(low);
        self.prev_close = Some(prev_close);
        self
    }

    /// Set volume and turnover.
    #[must_use]
    pub const fn with_volume(mut self, volume: Decimal, amount: Decimal) -> Self {
        self.volume = Some(volume);
        self.amount = Some(amount);
        self
    }

    /// Classify the quote by the sign of its percentage change.
    ///
    /// A missing change is treated as zero.
    #[must_use]
    pub fn direction(&self) -> Direction {
        match self.change_pct.unwrap_or_default().cmp(&Decimal::ZERO) {
            Ordering::Greater => Direction::Advancing,
            Ordering::Less => Direction::Declining,
            Ordering::Equal => Direction::Unchanged,
        }
    }
}

/// Price direction of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Positive change.
    Advancing,
    /// Negative change.
    Declining,
    /// Zero or unknown change.
    Unchanged,
}

/// Importance of a calendar event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventImportance {
    /// Minor release.
    Low,
    /// Notable release.
    Medium,
    /// Market-moving release.
    High,
}

/// A scheduled economic release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// Release date.
    pub date: NaiveDate,
    /// Local release time, if announced.
    #[serde(default)]
    pub time: Option<String>,
    /// Country or region code.
    pub country: String,
    /// Event title.
    pub event: String,
    /// Importance.
    pub importance: EventImportance,
    /// Consensus forecast.
    #[serde(default)]
    pub forecast: Option<String>,
    /// Previous reading.
    #[serde(default)]
    pub previous: Option<String>,
}

/// Category-specific body of a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadBody {
    /// Quote table for price categories.
    Quotes(QuoteTable),
    /// Ordered event list for the calendar.
    Events(Vec<CalendarEvent>),
}

/// Data for one category along with the time it was fetched.
///
/// `as_of` is `None` only for a payload that was never fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPayload {
    /// Time the payload was fetched from the provider.
    pub as_of: Option<DateTime<Utc>>,
    /// Quotes or events.
    #[serde(flatten)]
    pub body: PayloadBody,
}

impl CategoryPayload {
    /// Empty payload shaped for the given category.
    #[must_use]
    pub fn empty(category: Category) -> Self {
        let body = if category.is_event_list() {
            PayloadBody::Events(Vec::new())
        } else {
            PayloadBody::Quotes(QuoteTable::new())
        };
        Self { as_of: None, body }
    }

    /// Quote payload fetched at `as_of`.
    #[must_use]
    pub const fn quotes(as_of: DateTime<Utc>, quotes: QuoteTable) -> Self {
        Self {
            as_of: Some(as_of),
            body: PayloadBody::Quotes(quotes),
        }
    }

    /// Event payload fetched at `as_of`.
    #[must_use]
    pub const fn events(as_of: DateTime<Utc>, events: Vec<CalendarEvent>) -> Self {
        Self {
            as_of: Some(as_of),
            body: PayloadBody::Events(events),
        }
    }

    /// Number of instruments or events.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.body {
            PayloadBody::Quotes(quotes) => quotes.len(),
            PayloadBody::Events(events) => events.len(),
        }
    }

    /// Whether the payload carries no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Quote table, if this is a price payload.
    #[must_use]
    pub const fn quote_table(&self) -> Option<&QuoteTable> {
        match &self.body {
            PayloadBody::Quotes(quotes) => Some(quotes),
            PayloadBody::Events(_) => None,
        }
    }

    /// Copy of this payload keeping only the listed instrument codes.
    #[must_use]
    pub fn retain_codes(&self, codes: &[&str]) -> Self {
        let body = match &self.body {
            PayloadBody::Quotes(quotes) => PayloadBody::Quotes(
                quotes
                    .iter()
                    .filter(|(code, _)| codes.contains(&code.as_str()))
                    .map(|(code, quote)| (code.clone(), quote.clone()))
                    .collect(),
            ),
            PayloadBody::Events(events) => PayloadBody::Events(events.clone()),
        };
        Self {
            as_of: self.as_of,
            body,
        }
    }
}
