//! Rolling sample standard deviation.
//!
//! Divides by N-1. A period below 2 has no defined deviation.

use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_stddev(values: &[f64], period: usize) -> IndicatorSeries {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Stddev(period),
        values: rolling_stddev(&wrapped, period),
    }
}

pub fn rolling_stddev(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period < 2 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window: Option<Vec<f64>> = values[i + 1 - period..=i].iter().copied().collect();
            window.map(|w| sample_stddev(&w))
        })
        .collect()
}

/// Sample standard deviation of a slice; 0 for fewer than two values.
pub fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}
