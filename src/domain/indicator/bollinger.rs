//! Bollinger Bands indicator.
//!
//! - Middle: simple moving average over n periods
//! - Upper: middle + (multiplier × sample stddev)
//! - Lower: middle - (multiplier × sample stddev)
//!
//! Warmup: first (period-1) points are undefined.

use crate::domain::indicator::{calculate_sma, calculate_stddev, IndicatorType};

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub indicator_type: IndicatorType,
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

pub fn calculate_bollinger(values: &[f64], period: usize, stddev_mult_x100: u32) -> BollingerBands {
    let mult = stddev_mult_x100 as f64 / 100.0;
    let middle = calculate_sma(values, period).values;
    let stddev = calculate_stddev(values, period).values;

    let (upper, lower): (Vec<Option<f64>>, Vec<Option<f64>>) = middle
        .iter()
        .zip(&stddev)
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => (Some(m + mult * s), Some(m - mult * s)),
            _ => (None, None),
        })
        .unzip();

    BollingerBands {
        indicator_type: IndicatorType::Bollinger {
            period,
            stddev_mult_x100,
        },
        upper,
        middle,
        lower,
    }
}
