//! Technical indicator implementations.
//!
//! Every calculation returns an `IndicatorSeries`: one optional value per
//! input point, `None` while the indicator is still warming up or when an
//! input inside its window is undefined. Rolling windows follow the usual
//! convention of leaving the first `period - 1` points undefined.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod stddev;

pub use atr::calculate_atr;
pub use bollinger::{calculate_bollinger, BollingerBands};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdSeries};
pub use rsi::calculate_rsi;
pub use stddev::{calculate_stddev, rolling_stddev};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Stddev(usize),
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

impl IndicatorType {
    /// Number of leading points left undefined on a fully defined input.
    pub fn warmup(&self) -> usize {
        match self {
            IndicatorType::Sma(period)
            | IndicatorType::Rsi(period)
            | IndicatorType::Atr(period)
            | IndicatorType::Stddev(period)
            | IndicatorType::Bollinger { period, .. } => period.saturating_sub(1),
            IndicatorType::Ema(_) | IndicatorType::Macd { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn first_valid(&self) -> Option<usize> {
        self.values.iter().position(Option::is_some)
    }
}

/// Simple moving average of a fully defined input.
pub fn calculate_sma(values: &[f64], period: usize) -> IndicatorSeries {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: rolling_mean(&wrapped, period),
    }
}

/// Rolling mean over a possibly sparse input. A window containing any
/// undefined value yields `None`.
pub fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &values[i + 1 - period..=i];
            let sum = window.iter().try_fold(0.0, |acc, v| v.map(|x| acc + x))?;
            Some(sum / period as f64)
        })
        .collect()
}
