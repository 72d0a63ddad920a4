//! Market Data Types
//!
//! A [`Snapshot`] is assembled from one [`CategoryPayload`] per
//! [`Category`]. Payloads are either a quote table keyed by instrument code
//! or, for the calendar, an ordered list of events.

mod category;
mod display;
mod hours;
mod payload;
mod snapshot;

pub use category::Category;
pub use display::{IndexBoard, IndexDisplay, TrendColor, index_display_name};
pub use hours::MarketHours;
pub use payload::{
    CalendarEvent, CategoryPayload, Direction, EventImportance, PayloadBody, Quote, QuoteTable,
};
pub use snapshot::{A_SHARE_INDEX_CODES, MarketStatus, MarketSummary, Snapshot};
