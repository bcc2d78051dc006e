//! RSI (Relative Strength Index) indicator.
//!
//! Average gain and average loss are plain rolling means of the last n price
//! changes. The first point carries no change and counts as zero gain and
//! zero loss, so the first value is defined at index n-1.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100 when avg_gain > 0, otherwise 50 (flat window).

use crate::domain::indicator::{rolling_mean, IndicatorSeries, IndicatorType};

/// Value reported for a window with neither gains nor losses.
pub const NEUTRAL_RSI: f64 = 50.0;

pub fn calculate_rsi(values: &[f64], period: usize) -> IndicatorSeries {
    let mut gains = Vec::with_capacity(values.len());
    let mut losses = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        let change = if i == 0 { 0.0 } else { values[i] - values[i - 1] };
        gains.push(Some(change.max(0.0)));
        losses.push(Some((-change).max(0.0)));
    }

    let avg_gains = rolling_mean(&gains, period);
    let avg_losses = rolling_mean(&losses, period);

    let rsi = avg_gains
        .iter()
        .zip(&avg_losses)
        .map(|(gain, loss)| match (gain, loss) {
            (Some(gain), Some(loss)) => Some(rsi_from_averages(*gain, *loss)),
            _ => None,
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values: rsi,
    }
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain > 0.0 { 100.0 } else { NEUTRAL_RSI }
    } else {
        100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
    }
}
