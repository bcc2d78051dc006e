//! Risk-based entry sizing and exit levels.
//!
//! Every entry risks a fixed fraction of the portfolio between the entry
//! price and the stop. The stop sits beyond both the ATR band and the recent
//! extreme of the book; the target is a fixed reward multiple of that risk.

use crate::domain::frame::IndicatorFrame;
use crate::domain::position::Direction;

pub const DEFAULT_RISK_PER_TRADE: f64 = 0.02;
pub const DEFAULT_MIN_RR_RATIO: f64 = 2.0;
pub const DEFAULT_ATR_STOP_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_STOP_LOOKBACK: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskParams {
    pub risk_per_trade: f64,
    pub min_rr_ratio: f64,
    pub atr_stop_multiplier: f64,
    /// Extra points looked back when scanning for the recent extreme.
    pub stop_lookback: usize,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            risk_per_trade: DEFAULT_RISK_PER_TRADE,
            min_rr_ratio: DEFAULT_MIN_RR_RATIO,
            atr_stop_multiplier: DEFAULT_ATR_STOP_MULTIPLIER,
            stop_lookback: DEFAULT_STOP_LOOKBACK,
        }
    }
}

/// Whole units risking `portfolio_value * risk_per_trade` between entry and
/// stop. 0 when the two coincide.
pub fn position_size(portfolio_value: f64, risk_per_trade: f64, entry: f64, stop: f64) -> i64 {
    let price_risk = (entry - stop).abs();
    if price_risk == 0.0 {
        return 0;
    }
    (portfolio_value * risk_per_trade / price_risk).floor() as i64
}

/// Long: `min(mid - k*atr, lowest bid)`; short: `max(mid + k*atr, highest
/// ask)`, over indices `max(0, i - lookback)..=i`. `None` while ATR is
/// undefined.
pub fn stop_loss(frame: &IndicatorFrame, index: usize, direction: Direction, params: &RiskParams) -> Option<f64> {
    let atr = frame.atr_14.get(index).copied().flatten()?;
    let price = *frame.mid_price.get(index)?;
    let window = &frame.quotes[index.saturating_sub(params.stop_lookback)..=index];

    let stop = match direction {
        Direction::Long => {
            let recent_low = window.iter().map(|q| q.bid_price).fold(f64::INFINITY, f64::min);
            (price - params.atr_stop_multiplier * atr).min(recent_low)
        }
        Direction::Short => {
            let recent_high = window.iter().map(|q| q.ask_price).fold(f64::NEG_INFINITY, f64::max);
            (price + params.atr_stop_multiplier * atr).max(recent_high)
        }
    };
    Some(stop)
}

pub fn take_profit(direction: Direction, entry: f64, stop: f64, min_rr_ratio: f64) -> f64 {
    let risk = (entry - stop).abs();
    match direction {
        Direction::Long => entry + risk * min_rr_ratio,
        Direction::Short => entry - risk * min_rr_ratio,
    }
}

/// Fully priced entry, ready to be placed in a book.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPlan {
    pub direction: Direction,
    pub entry_price: f64,
    /// Signed by direction.
    pub size: i64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

/// Price an entry at the current mid. `None` when no stop can be computed
/// or the sized position would be empty.
pub fn plan_entry(
    frame: &IndicatorFrame,
    index: usize,
    direction: Direction,
    params: &RiskParams,
    portfolio_value: f64,
) -> Option<EntryPlan> {
    let entry_price = *frame.mid_price.get(index)?;
    let stop = stop_loss(frame, index, direction, params)?;
    let units = position_size(portfolio_value, params.risk_per_trade, entry_price, stop);
    if units <= 0 {
        return None;
    }

    Some(EntryPlan {
        direction,
        entry_price,
        size: units * direction.sign(),
        stop_loss: stop,
        take_profit: take_profit(direction, entry_price, stop, params.min_rr_ratio),
    })
}
