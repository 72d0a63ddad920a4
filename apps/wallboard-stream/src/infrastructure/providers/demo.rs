use async_trait::async_trait;
use chrono::{Days, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::application::ports::{MarketDataProvider, ProviderError};
use crate::domain::market::{CalendarEvent, EventImportance, Quote, QuoteTable};

/// Static description of a demo instrument.
struct Instrument {
    code: &'static str,
    name: &'static str,
    base: f64,
    /// Largest move, as a percentage of `base`.
    max_move_pct: f64,
    /// Decimal places of the price.
    dp: u32,
}

const fn instrument(
    code: &'static str,
    name: &'static str,
    base: f64,
    max_move_pct: f64,
    dp: u32,
) -> Instrument {
    Instrument {
        code,
        name,
        base,
        max_move_pct,
        dp,
    }
}

const INDICES: [Instrument; 9] = [
    instrument("000001.SH", "SSE Composite", 3150.0, 1.6, 2),
    instrument("399001.SZ", "SZSE Component", 11200.0, 0.45, 2),
    instrument("399006.SZ", "ChiNext", 2350.0, 2.1, 2),
    instrument("000300.SH", "CSI 300", 4180.0, 1.2, 2),
    instrument("000905.SH", "CSI 500", 6850.0, 0.73, 2),
    instrument("000852.SH", "CSI 1000", 7200.0, 0.7, 2),
    instrument("000016.SH", "SSE 50", 2850.0, 1.75, 2),
    instrument("399005.SZ", "SME Board", 8500.0, 0.6, 2),
    instrument("000688.SH", "STAR 50", 1050.0, 4.8, 2),
];

const FX: [Instrument; 4] = [
    instrument("USDCNY.EX", "USD/CNY", 7.25, 0.7, 4),
    instrument("EURCNY.EX", "EUR/CNY", 7.85, 0.64, 4),
    instrument("HKDCNY.EX", "HKD/CNY", 0.92, 0.5, 4),
    instrument("JPYCNY.EX", "JPY/CNY", 0.048, 0.5, 5),
];

const RATES: [Instrument; 4] = [
    instrument("M0000017.SH", "CGB 10Y", 2.85, 1.75, 3),
    instrument("M0000025.SH", "CGB 5Y", 2.65, 1.9, 3),
    instrument("M0000007.SH", "CGB 3Y", 2.45, 2.0, 3),
    instrument("M0000001.SH", "CGB 1Y", 2.25, 2.2, 3),
];

const COMMODITIES: [Instrument; 7] = [
    instrument("RB00.SHF", "Rebar", 3800.0, 3.0, 0),
    instrument("I00.DCE", "Iron Ore", 850.0, 3.0, 1),
    instrument("CU00.SHF", "Copper", 68500.0, 3.0, 0),
    instrument("AL00.SHF", "Aluminium", 18500.0, 3.0, 0),
    instrument("ZN00.SHF", "Zinc", 25200.0, 3.0, 0),
    instrument("AU00.SHF", "Gold", 465.0, 3.0, 2),
    instrument("AG00.SHF", "Silver", 5650.0, 3.0, 0),
];

const US_STOCKS: [Instrument; 8] = [
    instrument("DJI.GI", "Dow Jones", 35000.0, 3.0, 2),
    instrument("SPX.GI", "S&P 500", 4500.0, 3.0, 2),
    instrument("IXIC.GI", "Nasdaq Composite", 15000.0, 3.0, 2),
    instrument("AAPL.O", "Apple", 180.0, 3.0, 2),
    instrument("MSFT.O", "Microsoft", 330.0, 3.0, 2),
    instrument("GOOGL.O", "Alphabet", 2800.0, 3.0, 2),
    instrument("TSLA.O", "Tesla", 250.0, 3.0, 2),
    instrument("AMZN.O", "Amazon", 150.0, 3.0, 2),
];

/// Generates plausible random quotes around fixed base levels.
///
/// Every call produces new values; nothing is remembered between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct DemoProvider;

impl DemoProvider {
    /// Create a demo provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn decimal(value: f64, dp: u32) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default().round_dp(dp)
}

fn generate(instruments: &[Instrument]) -> QuoteTable {
    let mut rng = rand::rng();
    let now = Utc::now();

    instruments
        .iter()
        .map(|instrument| {
            let pct = rng.random_range(-instrument.max_move_pct..=instrument.max_move_pct);
            let last = instrument.base * (1.0 + pct / 100.0);
            let open = instrument.base * (1.0 + rng.random_range(-0.5..=0.5) * pct.abs() / 100.0);
            let high = last.max(open) * (1.0 + rng.random_range(0.0..0.005));
            let low = last.min(open) * (1.0 - rng.random_range(0.0..0.005));
            let volume = rng.random_range(10_000.0..50_000_000.0_f64).round();
            let amount = volume * last;

            let last = decimal(last, instrument.dp);
            let prev_close = decimal(instrument.base, instrument.dp);
            let quote = Quote::new(instrument.code, last, now)
                .with_name(instrument.name)
                .with_change(last - prev_close, decimal(pct, 2))
                .with_range(
                    decimal(open, instrument.dp),
                    decimal(high, instrument.dp),
                    decimal(low, instrument.dp),
                    prev_close,
                )
                .with_volume(decimal(volume, 0), decimal(amount, 0));
            (instrument.code.to_string(), quote)
        })
        .collect()
}

fn calendar() -> Vec<CalendarEvent> {
    let today = Utc::now().date_naive();
    let day = |offset: u64| today.checked_add_days(Days::new(offset)).unwrap_or(today);

    vec![
        CalendarEvent {
            date: day(0),
            time: Some("09:30".to_string()),
            country: "CN".to_string(),
            event: "CPI YoY".to_string(),
            importance: EventImportance::High,
            forecast: Some("0.4%".to_string()),
            previous: Some("0.3%".to_string()),
        },
        CalendarEvent {
            date: day(1),
            time: Some("09:45".to_string()),
            country: "CN".to_string(),
            event: "Caixin Manufacturing PMI".to_string(),
            importance: EventImportance::Medium,
            forecast: Some("50.6".to_string()),
            previous: Some("50.4".to_string()),
        },
        CalendarEvent {
            date: day(2),
            time: Some("20:30".to_string()),
            country: "US".to_string(),
            event: "Nonfarm Payrolls".to_string(),
            importance: EventImportance::High,
            forecast: None,
            previous: None,
        },
    ]
}

#[async_trait]
impl MarketDataProvider for DemoProvider {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn fetch_indices(&self) -> Result<QuoteTable, ProviderError> {
        Ok(generate(&INDICES))
    }

    async fn fetch_fx(&self) -> Result<QuoteTable, ProviderError> {
        Ok(generate(&FX))
    }

    async fn fetch_rates(&self) -> Result<QuoteTable, ProviderError> {
        Ok(generate(&RATES))
    }

    async fn fetch_commodities(&self) -> Result<QuoteTable, ProviderError> {
        Ok(generate(&COMMODITIES))
    }

    async fn fetch_us_stocks(&self) -> Result<QuoteTable, ProviderError> {
        Ok(generate(&US_STOCKS))
    }

    async fn fetch_calendar(&self) -> Result<Vec<CalendarEvent>, ProviderError> {
        Ok(calendar())
    }
}
