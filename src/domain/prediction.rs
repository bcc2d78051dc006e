//! Short-horizon bid extrapolation at detected trend changes.
//!
//! A trend change is flagged where the fast bid EMA sits above the slow one
//! and the 10-quote momentum exceeds the 20-quote bid volatility. From each
//! flagged quote the momentum is projected linearly over the next
//! [`PREDICTION_WINDOW`] quotes.

use chrono::NaiveTime;

use crate::domain::indicator::{calculate_ema, calculate_stddev};
use crate::domain::quote::Quote;

pub const EMA_SHORT_SPAN: usize = 10;
pub const EMA_LONG_SPAN: usize = 30;
pub const MOMENTUM_PERIOD: usize = 10;
pub const VOLATILITY_PERIOD: usize = 20;
pub const PREDICTION_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePrediction {
    pub timestamp: NaiveTime,
    pub predicted_price: f64,
    /// Index of the quote the projection started from.
    pub origin: usize,
}

pub fn predict_price_changes(quotes: &[Quote]) -> Vec<PricePrediction> {
    let bids: Vec<f64> = quotes.iter().map(|q| q.bid_price).collect();
    let ema_short = calculate_ema(&bids, EMA_SHORT_SPAN);
    let ema_long = calculate_ema(&bids, EMA_LONG_SPAN);
    let volatility = calculate_stddev(&bids, VOLATILITY_PERIOD);

    let mut predictions = Vec::new();
    for i in 0..quotes.len() {
        if i < MOMENTUM_PERIOD || i + PREDICTION_WINDOW >= quotes.len() {
            continue;
        }
        let momentum = bids[i] - bids[i - MOMENTUM_PERIOD];

        let trend_change = match (ema_short.value(i), ema_long.value(i), volatility.value(i)) {
            (Some(fast), Some(slow), Some(vol)) => fast > slow && momentum.abs() > vol,
            _ => false,
        };
        if !trend_change {
            continue;
        }

        predictions.extend((0..PREDICTION_WINDOW).map(|j| PricePrediction {
            timestamp: quotes[i + 1 + j].timestamp,
            predicted_price: bids[i] + momentum * (j + 1) as f64,
            origin: i,
        }));
    }
    predictions
}
