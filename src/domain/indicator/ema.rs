//! Exponential Moving Average indicator.
//!
//! α = 2/(span+1), seeded with the first value, then
//! EMA[i] = x[i]·α + EMA[i-1]·(1-α). Defined from the first point.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_ema(values: &[f64], span: usize) -> IndicatorSeries {
    if span == 0 || values.is_empty() {
        return IndicatorSeries {
            indicator_type: IndicatorType::Ema(span),
            values: vec![None; values.len()],
        };
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut ema = values[0];
    out.push(Some(ema));

    for &x in &values[1..] {
        ema = x * alpha + ema * (1.0 - alpha);
        out.push(Some(ema));
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(span),
        values: out,
    }
}
