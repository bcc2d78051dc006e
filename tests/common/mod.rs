#![allow(dead_code)]

use chrono::{Duration, NaiveTime};
use pairtrader::domain::error::PairtraderError;
use pairtrader::domain::quote::{Quote, Trade};
use pairtrader::ports::data_port::QuoteSource;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub struct MockQuoteSource {
    pub quotes: BTreeMap<String, Vec<Quote>>,
    pub trades: BTreeMap<String, Vec<Trade>>,
    pub errors: BTreeMap<String, String>,
}

impl MockQuoteSource {
    pub fn new() -> Self {
        Self {
            quotes: BTreeMap::new(),
            trades: BTreeMap::new(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_quotes(mut self, instrument: &str, quotes: Vec<Quote>) -> Self {
        self.quotes.insert(instrument.to_string(), quotes);
        self
    }

    pub fn with_trades(mut self, instrument: &str, trades: Vec<Trade>) -> Self {
        self.trades.insert(instrument.to_string(), trades);
        self
    }

    pub fn with_error(mut self, instrument: &str, reason: &str) -> Self {
        self.errors.insert(instrument.to_string(), reason.to_string());
        self
    }
}

impl QuoteSource for MockQuoteSource {
    fn fetch_quotes(&self, instrument: &str) -> Result<Vec<Quote>, PairtraderError> {
        if let Some(reason) = self.errors.get(instrument) {
            return Err(PairtraderError::DataRead {
                reason: reason.clone(),
            });
        }
        self.quotes
            .get(instrument)
            .cloned()
            .ok_or_else(|| PairtraderError::NoData {
                instrument: instrument.to_string(),
            })
    }

    fn fetch_trades(&self, instrument: &str) -> Result<Vec<Trade>, PairtraderError> {
        Ok(self.trades.get(instrument).cloned().unwrap_or_default())
    }

    fn list_instruments(&self) -> Result<Vec<String>, PairtraderError> {
        let mut names: Vec<String> = self
            .quotes
            .keys()
            .chain(self.errors.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

pub fn start_time() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap()
}

/// One quote per second with a 0.1 spread around `mid` and the given volumes.
pub fn make_quote(seconds: i64, mid: f64, bid_volume: f64, ask_volume: f64) -> Quote {
    Quote {
        timestamp: start_time() + Duration::seconds(seconds),
        bid_price: mid - 0.05,
        ask_price: mid + 0.05,
        bid_volume,
        ask_volume,
    }
}

pub fn quotes_from_mids(mids: &[f64]) -> Vec<Quote> {
    mids.iter()
        .enumerate()
        .map(|(i, &mid)| make_quote(i as i64, mid, 100.0, 100.0))
        .collect()
}

pub fn constant_quotes(count: usize, mid: f64) -> Vec<Quote> {
    quotes_from_mids(&vec![mid; count])
}

/// Oscillating uptrend: a drift plus a sine wave so both directions occur.
pub fn wave_mids(count: usize, start: f64, drift: f64, amplitude: f64) -> Vec<f64> {
    (0..count)
        .map(|i| start + drift * i as f64 + amplitude * (i as f64 / 7.0).sin())
        .collect()
}

/// Same wave scaled and offset, so returns stay highly correlated.
pub fn correlated_pair(count: usize) -> (Vec<Quote>, Vec<Quote>) {
    let a = wave_mids(count, 100.0, 0.05, 2.0);
    let b: Vec<f64> = a.iter().map(|m| m * 0.5 + 10.0).collect();
    (quotes_from_mids(&a), quotes_from_mids(&b))
}

/// Index at which [`burst_pair`] doubles its oscillation and tilts the book.
pub const BURST_START: usize = 130;

/// Drift plus a one-step alternation of amplitude 0.5, doubling at
/// [`BURST_START`]. Even indices sit on the upper side.
pub fn burst_mids(count: usize, drift: f64) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let amplitude = if i < BURST_START { 0.5 } else { 1.0 };
            let side = if i % 2 == 0 { 1.0 } else { -1.0 };
            100.0 + drift * i as f64 + amplitude * side
        })
        .collect()
}

/// From [`BURST_START`] the book leans 3:1 toward the trend: bid heavy on
/// even indices for a positive drift, ask heavy on odd ones otherwise.
fn burst_quotes(mids: &[f64], drift: f64) -> Vec<Quote> {
    mids.iter()
        .enumerate()
        .map(|(i, &mid)| {
            let leaning = i >= BURST_START && (i % 2 == 0) == (drift > 0.0);
            let (bid_volume, ask_volume) = match (leaning, drift > 0.0) {
                (true, true) => (300.0, 100.0),
                (true, false) => (100.0, 300.0),
                _ => (100.0, 100.0),
            };
            make_quote(i as i64, mid, bid_volume, ask_volume)
        })
        .collect()
}

/// Two perfectly correlated trending instruments whose last stretch turns
/// volatile with a one-sided book, so entries fire in the drift direction.
pub fn burst_pair(count: usize, drift: f64) -> (Vec<Quote>, Vec<Quote>) {
    let a = burst_mids(count, drift);
    let b: Vec<f64> = a.iter().map(|m| m * 0.5 + 10.0).collect();
    (burst_quotes(&a, drift), burst_quotes(&b, drift))
}

pub const MARKET_HEADER: &str = "bidVolume,bidPrice,askVolume,askPrice,timestamp\n";

/// Write `<dir>/<period>/<instrument>/market_data_<instrument>.csv`.
pub fn write_market_data(dir: &Path, period: &str, instrument: &str, quotes: &[Quote]) {
    let inst_dir = dir.join(period).join(instrument);
    fs::create_dir_all(&inst_dir).unwrap();
    let mut content = String::from(MARKET_HEADER);
    for q in quotes {
        content.push_str(&format!(
            "{},{},{},{},{}\n",
            q.bid_volume,
            q.bid_price,
            q.ask_volume,
            q.ask_price,
            q.timestamp.format("%H:%M:%S%.9f")
        ));
    }
    fs::write(inst_dir.join(format!("market_data_{}.csv", instrument)), content).unwrap();
}
