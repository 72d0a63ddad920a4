use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, CategoryPayload, Direction, IndexBoard, IndexDisplay};

/// Mainland A-share benchmark indices shown on the A-share board.
pub const A_SHARE_INDEX_CODES: [&str; 7] = [
    "000001.SH", // SSE Composite
    "399001.SZ", // SZSE Component
    "399006.SZ", // ChiNext
    "000300.SH", // CSI 300
    "000905.SH", // CSI 500
    "000852.SH", // CSI 1000
    "000016.SH", // SSE 50
];

/// Coarse exchange status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketStatus {
    /// Inside a trading session.
    Open,
    /// Outside trading sessions.
    Closed,
}

/// Breadth statistics over the indices category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSummary {
    /// Open/closed flag.
    pub market_status: MarketStatus,
    /// Number of indices considered.
    pub total_indices: usize,
    /// Indices with a positive change.
    pub advancing: usize,
    /// Indices with a negative change.
    pub declining: usize,
    /// Indices with zero or unknown change.
    pub unchanged: usize,
}

impl MarketSummary {
    /// Tally index directions. Non-quote payloads count as empty.
    #[must_use]
    pub fn from_indices(indices: &CategoryPayload, market_status: MarketStatus) -> Self {
        let mut summary = Self {
            market_status,
            total_indices: 0,
            advancing: 0,
            declining: 0,
            unchanged: 0,
        };
        for quote in indices.quote_table().into_iter().flat_map(|t| t.values()) {
            summary.total_indices += 1;
            match quote.direction() {
                Direction::Advancing => summary.advancing += 1,
                Direction::Declining => summary.declining += 1,
                Direction::Unchanged => summary.unchanged += 1,
            }
        }
        summary
    }
}

/// Immutable composite of every category plus summary.
///
/// Produced fresh by each build and shared by `Arc` among all recipients
/// of one broadcast pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Time aggregation completed.
    pub timestamp: DateTime<Utc>,
    /// Equity indices.
    pub indices: CategoryPayload,
    /// FX rates.
    pub fx: CategoryPayload,
    /// Rates and yields.
    pub rates: CategoryPayload,
    /// Commodity futures.
    pub commodities: CategoryPayload,
    /// US indices and stocks.
    pub us_stocks: CategoryPayload,
    /// Economic calendar.
    pub calendar: CategoryPayload,
    /// Breadth summary over `indices`.
    pub summary: MarketSummary,
}

impl Snapshot {
    /// Snapshot in which every category is empty.
    #[must_use]
    pub fn empty(timestamp: DateTime<Utc>, market_status: MarketStatus) -> Self {
        let indices = CategoryPayload::empty(Category::Indices);
        let summary = MarketSummary::from_indices(&indices, market_status);
        Self {
            timestamp,
            indices,
            fx: CategoryPayload::empty(Category::Fx),
            rates: CategoryPayload::empty(Category::Rates),
            commodities: CategoryPayload::empty(Category::Commodities),
            us_stocks: CategoryPayload::empty(Category::UsStocks),
            calendar: CategoryPayload::empty(Category::Calendar),
            summary,
        }
    }

    /// Payload for the given category.
    #[must_use]
    pub const fn payload(&self, category: Category) -> &CategoryPayload {
        match category {
            Category::Indices => &self.indices,
            Category::Fx => &self.fx,
            Category::Rates => &self.rates,
            Category::Commodities => &self.commodities,
            Category::UsStocks => &self.us_stocks,
            Category::Calendar => &self.calendar,
        }
    }

    /// Indices restricted to the A-share benchmarks.
    #[must_use]
    pub fn a_share_indices(&self) -> CategoryPayload {
        self.indices.retain_codes(&A_SHARE_INDEX_CODES)
    }

    /// A-share indices decorated for the wallboard.
    #[must_use]
    pub fn a_share_board(&self) -> IndexBoard {
        self.indices
            .quote_table()
            .into_iter()
            .flatten()
            .filter(|(code, _)| A_SHARE_INDEX_CODES.contains(&code.as_str()))
            .map(|(code, quote)| (code.clone(), IndexDisplay::from_quote(quote)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::market::{Quote, QuoteTable};

    fn indices(changes: &[(&str, Option<i64>)]) -> CategoryPayload {
        let now = Utc::now();
        let table: QuoteTable = changes
            .iter()
            .map(|(code, pct)| {
                let mut quote = Quote::new(*code, Decimal::new(1000, 0), now);
                quote.change_pct = pct.map(|p| Decimal::new(p, 0));
                ((*code).to_string(), quote)
            })
            .collect();
        CategoryPayload::quotes(now, table)
    }

    #[test]
    fn summary_counts_each_direction() {
        let payload = indices(&[("A", Some(1)), ("B", Some(-1)), ("C", Some(0))]);
        let summary = MarketSummary::from_indices(&payload, MarketStatus::Open);

        assert_eq!(summary.advancing, 1);
        assert_eq!(summary.declining, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.total_indices, 3);
    }

    #[test]
    fn missing_change_counts_as_unchanged() {
        let payload = indices(&[("A", None)]);
        let summary = MarketSummary::from_indices(&payload, MarketStatus::Closed);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.market_status, MarketStatus::Closed);
    }

    #[test]
    fn empty_indices_yield_zero_summary() {
        let summary =
            MarketSummary::from_indices(&CategoryPayload::empty(Category::Indices), MarketStatus::Open);
        assert_eq!(summary.total_indices, 0);
        assert_eq!(summary.advancing + summary.declining + summary.unchanged, 0);
    }

    #[test]
    fn summary_serializes_lowercase_status() {
        let summary =
            MarketSummary::from_indices(&CategoryPayload::empty(Category::Indices), MarketStatus::Open);
        let json = serde_json::to_value(summary).unwrap();
        assert_eq!(json["market_status"], "open");
    }

    #[test]
    fn a_share_board_decorates_only_benchmarks() {
        let mut snapshot = Snapshot::empty(Utc::now(), MarketStatus::Open);
        snapshot.indices = indices(&[
            ("000001.SH", Some(1)),
            ("399005.SZ", Some(-2)),
            ("000300.SH", Some(-1)),
        ]);

        let board = snapshot.a_share_board();

        assert_eq!(board.keys().collect::<Vec<_>>(), ["000001.SH", "000300.SH"]);
        assert_eq!(board["000001.SH"].display_name, "上证综指");
        assert_eq!(board["000300.SH"].formatted_change_pct, "-1.00%");
    }

    proptest! {
        #[test]
        fn summary_counts_partition_total(pcts in proptest::collection::vec(proptest::option::of(-500i64..500), 0..40)) {
            let codes: Vec<String> = (0..pcts.len()).map(|i| format!("I{i:03}")).collect();
            let changes: Vec<(&str, Option<i64>)> = codes
                .iter()
                .map(String::as_str)
                .zip(pcts.iter().copied())
                .collect();
            let summary = MarketSummary::from_indices(&indices(&changes), MarketStatus::Open);

            prop_assert_eq!(summary.total_indices, pcts.len());
            prop_assert_eq!(summary.advancing + summary.declining + summary.unchanged, pcts.len());
            prop_assert_eq!(summary.advancing, pcts.iter().filter(|p| matches!(p, Some(v) if *v > 0)).count());
            prop_assert_eq!(summary.declining, pcts.iter().filter(|p| matches!(p, Some(v) if *v < 0)).count());
        }
    }
}
