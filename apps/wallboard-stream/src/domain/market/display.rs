//! Wallboard presentation of the A-share indices.
//!
//! Each quote is carried unchanged and extended with a board name, a trend
//! color and two-decimal strings ready for display.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use super::Quote;

/// Board label for an A-share benchmark, if it is one.
#[must_use]
pub fn index_display_name(code: &str) -> Option<&'static str> {
    let name = match code {
        "000001.SH" => "上证综指",
        "399001.SZ" => "深证成指",
        "399006.SZ" => "创业板指",
        "000300.SH" => "沪深300",
        "000905.SH" => "中证500",
        "000852.SH" => "中证1000",
        "000016.SH" => "上证50",
        _ => return None,
    };
    Some(name)
}

/// Tile color. Missing change counts as flat and shows green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendColor {
    /// Zero or positive change.
    Green,
    /// Negative change.
    Red,
}

/// A quote decorated for the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDisplay {
    /// Underlying quote, serialized inline.
    #[serde(flatten)]
    pub quote: Quote,
    /// Board label; the code when no label is known.
    pub display_name: String,
    /// Tile color.
    pub color: TrendColor,
    /// Last level, e.g. `3150.12`.
    pub formatted_last: String,
    /// Signed change, e.g. `+14.18`.
    pub formatted_change: String,
    /// Signed change percent, e.g. `-0.45%`.
    pub formatted_change_pct: String,
}

impl IndexDisplay {
    /// Decorate `quote`. Missing change fields format as zero.
    #[must_use]
    pub fn from_quote(quote: &Quote) -> Self {
        let change = quote.change.unwrap_or_default();
        let change_pct = quote.change_pct.unwrap_or_default();
        Self {
            display_name: index_display_name(&quote.code)
                .map_or_else(|| quote.code.clone(), str::to_string),
            color: if change_pct < Decimal::ZERO {
                TrendColor::Red
            } else {
                TrendColor::Green
            },
            formatted_last: two_places(quote.last).to_string(),
            formatted_change: signed(change),
            formatted_change_pct: format!("{}%", signed(change_pct)),
            quote: quote.clone(),
        }
    }
}

/// Decorated indices keyed by code.
pub type IndexBoard = BTreeMap<String, IndexDisplay>;

fn two_places(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(2);
    rounded.rescale(2);
    rounded
}

fn signed(value: Decimal) -> String {
    let rounded = two_places(value);
    if rounded < Decimal::ZERO {
        rounded.to_string()
    } else {
        format!("+{}", rounded.abs())
    }
}
