//! CSV file data adapter.
//!
//! Layout of one trading period:
//!
//! ```text
//! <base>/<period>/<instrument>/market_data_<instrument>*.csv
//! <base>/<period>/<instrument>/trade_data_<instrument>.csv
//! ```
//!
//! Market data files carry `bidVolume,bidPrice,askVolume,askPrice,timestamp`
//! with a time-of-day timestamp such as `08:00:00.005926909`. Every market
//! data file of an instrument is read and the combined quotes are sorted by
//! timestamp.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::error::PairtraderError;
use crate::domain::quote::{Quote, Trade};
use crate::ports::data_port::QuoteSource;

const TIME_FORMAT: &str = "%H:%M:%S%.f";

#[derive(Debug, Deserialize)]
struct QuoteRow {
    #[serde(rename = "bidVolume")]
    bid_volume: f64,
    #[serde(rename = "bidPrice")]
    bid_price: f64,
    #[serde(rename = "askVolume")]
    ask_volume: f64,
    #[serde(rename = "askPrice")]
    ask_price: f64,
    timestamp: String,
}

#[derive(Debug, Deserialize)]
struct TradeRow {
    price: f64,
    volume: f64,
    timestamp: String,
}

pub struct CsvAdapter {
    period_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: impl Into<PathBuf>, period: &str) -> Self {
        Self {
            period_path: base_path.into().join(period),
        }
    }

    pub fn period_path(&self) -> &Path {
        &self.period_path
    }

    fn instrument_dir(&self, instrument: &str) -> PathBuf {
        self.period_path.join(instrument)
    }

    fn market_data_files(&self, instrument: &str) -> Result<Vec<PathBuf>, PairtraderError> {
        let dir = self.instrument_dir(instrument);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => {
                return Err(PairtraderError::NoData {
                    instrument: instrument.to_string(),
                });
            }
        };

        let prefix = format!("market_data_{}", instrument);
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PairtraderError::DataRead {
                reason: format!("failed to list {}: {}", dir.display(), e),
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && name.ends_with(".csv") {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

fn parse_time(value: &str, path: &Path) -> Result<NaiveTime, PairtraderError> {
    NaiveTime::parse_from_str(value.trim(), TIME_FORMAT).map_err(|e| PairtraderError::DataRead {
        reason: format!("invalid timestamp '{}' in {}: {}", value, path.display(), e),
    })
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>, PairtraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PairtraderError::DataRead {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

    rdr.deserialize()
        .map(|row| {
            row.map_err(|e| PairtraderError::DataRead {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })
        })
        .collect()
}

impl QuoteSource for CsvAdapter {
    fn fetch_quotes(&self, instrument: &str) -> Result<Vec<Quote>, PairtraderError> {
        let files = self.market_data_files(instrument)?;
        if files.is_empty() {
            return Err(PairtraderError::NoData {
                instrument: instrument.to_string(),
            });
        }

        let mut quotes = Vec::new();
        for path in &files {
            for row in read_rows::<QuoteRow>(path)? {
                quotes.push(Quote {
                    timestamp: parse_time(&row.timestamp, path)?,
                    bid_price: row.bid_price,
                    ask_price: row.ask_price,
                    bid_volume: row.bid_volume,
                    ask_volume: row.ask_volume,
                });
            }
        }

        // stable: equal timestamps keep file then row order
        quotes.sort_by_key(|q| q.timestamp);
        debug!(instrument, files = files.len(), quotes = quotes.len(), "quotes loaded");
        Ok(quotes)
    }

    fn fetch_trades(&self, instrument: &str) -> Result<Vec<Trade>, PairtraderError> {
        let path = self.instrument_dir(instrument).join(format!("trade_data_{}.csv", instrument));
        if !path.exists() {
            warn!(instrument, path = %path.display(), "trade data file not found");
            return Ok(Vec::new());
        }

        let mut trades = read_rows::<TradeRow>(&path)?
            .into_iter()
            .map(|row| {
                Ok(Trade {
                    timestamp: parse_time(&row.timestamp, &path)?,
                    price: row.price,
                    volume: row.volume,
                })
            })
            .collect::<Result<Vec<_>, PairtraderError>>()?;
        trades.sort_by_key(|t| t.timestamp);
        Ok(trades)
    }

    fn list_instruments(&self) -> Result<Vec<String>, PairtraderError> {
        let entries = fs::read_dir(&self.period_path).map_err(|e| PairtraderError::DataRead {
            reason: format!("failed to list {}: {}", self.period_path.display(), e),
        })?;

        let mut instruments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PairtraderError::DataRead {
                reason: format!("failed to list {}: {}", self.period_path.display(), e),
            })?;
            if entry.path().is_dir() {
                instruments.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        instruments.sort();
        Ok(instruments)
    }
}
