//! Average True Range over top-of-book quotes.
//!
//! True range uses the ask as the high, the bid as the low and the previous
//! mid price as the reference close. The first quote has no predecessor and
//! contributes its spread. ATR is the plain rolling mean of true range.

use crate::domain::indicator::{rolling_mean, IndicatorSeries, IndicatorType};
use crate::domain::quote::Quote;

pub fn calculate_atr(quotes: &[Quote], period: usize) -> IndicatorSeries {
    let true_ranges: Vec<Option<f64>> = quotes
        .iter()
        .enumerate()
        .map(|(i, quote)| {
            Some(if i == 0 {
                quote.spread()
            } else {
                quote.true_range(quotes[i - 1].mid_price())
            })
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: rolling_mean(&true_ranges, period),
    }
}
