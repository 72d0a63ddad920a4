use chrono::{DateTime, Datelike, FixedOffset, NaiveTime, Offset, Utc, Weekday};

use super::MarketStatus;

/// Default exchange offset from UTC (China Standard Time).
const DEFAULT_UTC_OFFSET_MINUTES: i32 = 8 * 60;

/// Weekday trading sessions of the home exchange.
///
/// Only used for the coarse open/closed flag in the snapshot summary;
/// holidays are not modelled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketHours {
    offset: FixedOffset,
    sessions: Vec<(NaiveTime, NaiveTime)>,
}

impl MarketHours {
    /// Create market hours from an exchange offset and half-open
    /// `[start, end)` sessions in exchange-local time.
    #[must_use]
    pub const fn new(offset: FixedOffset, sessions: Vec<(NaiveTime, NaiveTime)>) -> Self {
        Self { offset, sessions }
    }

    /// Mainland session times (09:30-11:30, 13:00-15:00) at the given offset.
    #[must_use]
    pub fn mainland(utc_offset_minutes: i32) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60)).unwrap_or_else(|| Utc.fix());
        Self::new(
            offset,
            vec![(hm(9, 30), hm(11, 30)), (hm(13, 0), hm(15, 0))],
        )
    }

    /// Status at the given instant.
    #[must_use]
    pub fn status_at(&self, now: DateTime<Utc>) -> MarketStatus {
        let local = now.with_timezone(&self.offset);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return MarketStatus::Closed;
        }
        let time = local.time();
        if self
            .sessions
            .iter()
            .any(|(start, end)| *start <= time && time < *end)
        {
            MarketStatus::Open
        } else {
            MarketStatus::Closed
        }
    }
}

impl Default for MarketHours {
    fn default() -> Self {
        Self::mainland(DEFAULT_UTC_OFFSET_MINUTES)
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}
