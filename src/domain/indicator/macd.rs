//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//!
//! Default parameters: fast=12, slow=26, signal=9. Every EMA is seeded with
//! its first input, so both lines are defined from the first point.

use crate::domain::indicator::{calculate_ema, IndicatorSeries, IndicatorType};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: IndicatorSeries,
    pub signal: IndicatorSeries,
}

pub fn calculate_macd(values: &[f64], fast: usize, slow: usize, signal_period: usize) -> MacdSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };

    if values.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return MacdSeries {
            line: IndicatorSeries {
                indicator_type: indicator_type.clone(),
                values: vec![None; values.len()],
            },
            signal: IndicatorSeries {
                indicator_type,
                values: vec![None; values.len()],
            },
        };
    }

    let ema_fast = calculate_ema(values, fast);
    let ema_slow = calculate_ema(values, slow);

    let line: Vec<f64> = ema_fast
        .values
        .iter()
        .zip(&ema_slow.values)
        .map(|(f, s)| f.unwrap_or(0.0) - s.unwrap_or(0.0))
        .collect();
    let signal = calculate_ema(&line, signal_period);

    MacdSeries {
        line: IndicatorSeries {
            indicator_type: indicator_type.clone(),
            values: line.into_iter().map(Some).collect(),
        },
        signal: IndicatorSeries {
            indicator_type,
            values: signal.values,
        },
    }
}

pub fn calculate_macd_default(values: &[f64]) -> MacdSeries {
    calculate_macd(values, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
