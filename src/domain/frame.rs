//! Per-instrument indicator frame: the quote series augmented with every
//! technical column the signal generator reads.

use chrono::NaiveTime;
use tracing::debug;

use crate::domain::error::PairtraderError;
use crate::domain::indicator::{
    calculate_atr, calculate_bollinger, calculate_rsi, calculate_sma, macd::calculate_macd_default,
    rolling_mean, IndicatorType,
};
use crate::domain::quote::Quote;

pub const SMA_SHORT_PERIOD: usize = 20;
pub const SMA_LONG_PERIOD: usize = 50;
pub const ATR_PERIOD: usize = 14;
pub const ATR_MEAN_PERIOD: usize = 100;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_MULT_X100: u32 = 200;
pub const RSI_PERIOD: usize = 14;
pub const VOLUME_RATIO_PERIOD: usize = 20;
pub const IMBALANCE_PERIOD: usize = 10;

/// Shorter series produce an empty frame.
pub const MIN_QUOTES: usize = 30;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorFrame {
    pub instrument: String,
    pub quotes: Vec<Quote>,
    pub mid_price: Vec<f64>,
    pub sma_20: Vec<Option<f64>>,
    pub sma_50: Vec<Option<f64>>,
    pub atr_14: Vec<Option<f64>>,
    pub atr_mean_100: Vec<Option<f64>>,
    pub bollinger_upper: Vec<Option<f64>>,
    pub bollinger_lower: Vec<Option<f64>>,
    pub rsi_14: Vec<Option<f64>>,
    pub macd: Vec<Option<f64>>,
    pub macd_signal: Vec<Option<f64>>,
    pub volume_ratio: Vec<Option<f64>>,
    pub volume_ratio_sma_20: Vec<Option<f64>>,
    pub book_imbalance: Vec<Option<f64>>,
    pub book_imbalance_sma_10: Vec<Option<f64>>,
}

impl IndicatorFrame {
    pub fn empty(instrument: &str) -> Self {
        Self {
            instrument: instrument.to_string(),
            ..Self::default()
        }
    }

    /// Validate the quotes and compute every indicator column.
    ///
    /// Quotes must already be in non-decreasing timestamp order; they are
    /// never re-sorted here. A series shorter than [`MIN_QUOTES`] yields an
    /// empty frame rather than an error.
    pub fn compute(instrument: &str, quotes: &[Quote]) -> Result<Self, PairtraderError> {
        validate_quotes(instrument, quotes)?;

        if quotes.len() < MIN_QUOTES {
            debug!(
                instrument,
                quotes = quotes.len(),
                minimum = MIN_QUOTES,
                "series too short, returning empty frame"
            );
            return Ok(Self::empty(instrument));
        }

        let mid_price: Vec<f64> = quotes.iter().map(Quote::mid_price).collect();
        let atr_14 = calculate_atr(quotes, ATR_PERIOD).values;
        let atr_mean_100 = rolling_mean(&atr_14, ATR_MEAN_PERIOD);
        let bands = calculate_bollinger(&mid_price, BOLLINGER_PERIOD, BOLLINGER_MULT_X100);
        let macd = calculate_macd_default(&mid_price);
        let volume_ratio: Vec<Option<f64>> = quotes.iter().map(Quote::volume_ratio).collect();
        let book_imbalance: Vec<Option<f64>> = quotes.iter().map(Quote::book_imbalance).collect();

        debug!(instrument, quotes = quotes.len(), "indicator frame computed");

        Ok(Self {
            instrument: instrument.to_string(),
            quotes: quotes.to_vec(),
            sma_20: calculate_sma(&mid_price, SMA_SHORT_PERIOD).values,
            sma_50: calculate_sma(&mid_price, SMA_LONG_PERIOD).values,
            atr_14,
            atr_mean_100,
            bollinger_upper: bands.upper,
            bollinger_lower: bands.lower,
            rsi_14: calculate_rsi(&mid_price, RSI_PERIOD).values,
            macd: macd.line.values,
            macd_signal: macd.signal.values,
            volume_ratio_sma_20: rolling_mean(&volume_ratio, VOLUME_RATIO_PERIOD),
            volume_ratio,
            book_imbalance_sma_10: rolling_mean(&book_imbalance, IMBALANCE_PERIOD),
            book_imbalance,
            mid_price,
        })
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn timestamp(&self, index: usize) -> Option<NaiveTime> {
        self.quotes.get(index).map(|q| q.timestamp)
    }

    pub fn timestamps(&self) -> Vec<NaiveTime> {
        self.quotes.iter().map(|q| q.timestamp).collect()
    }

    /// Index from which every rolling column is defined on fully defined
    /// input: ATR(14) needs 13 points, its 100-period mean 99 more.
    pub fn warmup_len() -> usize {
        let atr_mean =
            IndicatorType::Atr(ATR_PERIOD).warmup() + IndicatorType::Sma(ATR_MEAN_PERIOD).warmup();
        atr_mean.max(IndicatorType::Sma(SMA_LONG_PERIOD).warmup())
    }

    /// Percentage change of the mid price; undefined at the first point.
    pub fn returns(&self) -> Vec<Option<f64>> {
        (0..self.mid_price.len())
            .map(|i| {
                if i == 0 {
                    None
                } else {
                    let prev = self.mid_price[i - 1];
                    Some((self.mid_price[i] - prev) / prev)
                }
            })
            .collect()
    }

    /// True when every indicator column holds a value at `index`.
    pub fn is_fully_defined(&self, index: usize) -> bool {
        if index >= self.len() {
            return false;
        }
        [
            &self.sma_20,
            &self.sma_50,
            &self.atr_14,
            &self.atr_mean_100,
            &self.bollinger_upper,
            &self.bollinger_lower,
            &self.rsi_14,
            &self.macd,
            &self.macd_signal,
            &self.volume_ratio,
            &self.volume_ratio_sma_20,
            &self.book_imbalance,
            &self.book_imbalance_sma_10,
        ]
        .iter()
        .all(|column| column[index].is_some_and(f64::is_finite))
    }
}

/// `InsufficientData` when `quotes` is too short for a non-empty frame.
pub fn ensure_min_quotes(instrument: &str, quotes: &[Quote]) -> Result<(), PairtraderError> {
    if quotes.len() < MIN_QUOTES {
        return Err(PairtraderError::InsufficientData {
            instrument: instrument.to_string(),
            quotes: quotes.len(),
            minimum: MIN_QUOTES,
        });
    }
    Ok(())
}

fn validate_quotes(instrument: &str, quotes: &[Quote]) -> Result<(), PairtraderError> {
    for (index, quote) in quotes.iter().enumerate() {
        let prices_ok = quote.bid_price.is_finite()
            && quote.ask_price.is_finite()
            && quote.bid_price > 0.0
            && quote.ask_price > 0.0;
        if !prices_ok {
            return Err(PairtraderError::InvalidQuote {
                instrument: instrument.to_string(),
                index,
                reason: format!(
                    "prices must be finite and positive (bid {}, ask {})",
                    quote.bid_price, quote.ask_price
                ),
            });
        }

        let volumes_ok = quote.bid_volume.is_finite()
            && quote.ask_volume.is_finite()
            && quote.bid_volume >= 0.0
            && quote.ask_volume >= 0.0;
        if !volumes_ok {
            return Err(PairtraderError::InvalidQuote {
                instrument: instrument.to_string(),
                index,
                reason: "volumes must be finite and non-negative".to_string(),
            });
        }

        if index > 0 && quote.timestamp < quotes[index - 1].timestamp {
            return Err(PairtraderError::UnsortedQuotes {
                instrument: instrument.to_string(),
                index,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_quotes(prices: &[f64]) -> Vec<Quote> {
        let start = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &mid)| Quote {
                timestamp: start + Duration::milliseconds(i as i64 * 100),
                bid_price: mid - 0.25,
                ask_price: mid + 0.25,
                bid_volume: 20.0,
                ask_volume: 10.0,
            })
            .collect()
    }

    #[test]
    fn short_series_yields_empty_frame() {
        let quotes = make_quotes(&[100.0; MIN_QUOTES - 1]);
        let frame = IndicatorFrame::compute("A", &quotes).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.instrument, "A");
    }

    #[test]
    fn columns_match_quote_count() {
        let prices: Vec<f64> = (0..150).map(|i| 100.0 + (i as f64 * 0.1).sin()).collect();
        let frame = IndicatorFrame::compute("A", &make_quotes(&prices)).unwrap();

        assert_eq!(frame.len(), 150);
        assert_eq!(frame.mid_price.len(), 150);
        assert_eq!(frame.sma_50.len(), 150);
        assert_eq!(frame.atr_mean_100.len(), 150);
        assert_eq!(frame.book_imbalance_sma_10.len(), 150);
    }

    #[test]
    fn ensure_min_quotes_boundary() {
        let short = make_quotes(&[100.0; 29]);
        match ensure_min_quotes("A", &short) {
            Err(PairtraderError::InsufficientData { quotes, minimum, .. }) => {
                assert_eq!(quotes, 29);
                assert_eq!(minimum, MIN_QUOTES);
            }
            other => panic!("expected InsufficientData, got {:?}", other),
        }
        assert!(ensure_min_quotes("A", &make_quotes(&[100.0; 30])).is_ok());
    }

    #[test]
    fn warmup_boundaries() {
        let prices: Vec<f64> = (0..150).map(|i| 100.0 + (i as f64 * 0.1).sin()).collect();
        let frame = IndicatorFrame::compute("A", &make_quotes(&prices)).unwrap();

        assert!(frame.sma_20[18].is_none());
        assert!(frame.sma_20[19].is_some());
        assert!(frame.sma_50[48].is_none());
        assert!(frame.sma_50[49].is_some());
        assert!(frame.atr_14[12].is_none());
        assert!(frame.atr_14[13].is_some());
        assert!(frame.atr_mean_100[111].is_none());
        assert!(frame.atr_mean_100[112].is_some());
        assert!(frame.book_imbalance_sma_10[9].is_some());

        let warmup = IndicatorFrame::warmup_len();
        assert_eq!(warmup, 112);
        assert!(!frame.is_fully_defined(warmup - 1));
        for i in warmup..frame.len() {
            assert!(frame.is_fully_defined(i), "index {} should be defined", i);
        }
    }

    #[test]
    fn constant_price_collapses_volatility() {
        let quotes: Vec<Quote> = make_quotes(&[100.0; 150])
            .into_iter()
            .map(|q| Quote {
                bid_price: 100.0,
                ask_price: 100.0,
                ..q
            })
            .collect();
        let frame = IndicatorFrame::compute("A", &quotes).unwrap();

        for i in 19..150 {
            assert_eq!(frame.bollinger_upper[i], Some(100.0));
            assert_eq!(frame.bollinger_lower[i], Some(100.0));
        }
        for i in 13..150 {
            assert_eq!(frame.atr_14[i], Some(0.0));
        }
    }

    #[test]
    fn volume_ratio_undefined_on_empty_ask() {
        let mut quotes = make_quotes(&[100.0; 40]);
        quotes[5].ask_volume = 0.0;
        let frame = IndicatorFrame::compute("A", &quotes).unwrap();

        assert_eq!(frame.volume_ratio[5], None);
        assert_eq!(frame.volume_ratio[6], Some(2.0));
        // every 20-point window touching index 5 is undefined
        assert!(frame.volume_ratio_sma_20[19..=24].iter().all(Option::is_none));
        assert_eq!(frame.volume_ratio_sma_20[25], Some(2.0));
    }

    #[test]
    fn returns_are_percentage_changes() {
        let frame = IndicatorFrame::compute("A", &make_quotes(&[100.0; 40])).unwrap();
        let returns = frame.returns();
        assert_eq!(returns[0], None);
        assert_eq!(returns[1], Some(0.0));
    }

    #[test]
    fn unsorted_quotes_rejected() {
        let mut quotes = make_quotes(&[100.0; 40]);
        quotes.swap(10, 11);
        let err = IndicatorFrame::compute("A", &quotes).unwrap_err();
        assert!(matches!(err, PairtraderError::UnsortedQuotes { index: 11, .. }));
    }

    #[test]
    fn equal_timestamps_accepted() {
        let mut quotes = make_quotes(&[100.0; 40]);
        quotes[11].timestamp = quotes[10].timestamp;
        assert!(IndicatorFrame::compute("A", &quotes).is_ok());
    }

    #[test]
    fn non_positive_price_rejected() {
        let mut quotes = make_quotes(&[100.0; 40]);
        quotes[3].bid_price = 0.0;
        let err = IndicatorFrame::compute("A", &quotes).unwrap_err();
        assert!(matches!(err, PairtraderError::InvalidQuote { index: 3, .. }));
    }

    #[test]
    fn nan_volume_rejected() {
        let mut quotes = make_quotes(&[100.0; 40]);
        quotes[7].bid_volume = f64::NAN;
        assert!(IndicatorFrame::compute("A", &quotes).is_err());
    }
}
