//! Long/short entry signals.
//!
//! A signal fires only when every technical condition holds on the
//! instrument's own frame and the cross-instrument confirmation from
//! registered relationships points the same way.

use std::collections::HashMap;

use crate::domain::frame::IndicatorFrame;
use crate::domain::relationship::RelationshipRegistry;
use crate::domain::timeline::asof_indices;

pub const RSI_LONG_RANGE: (f64, f64) = (40.0, 70.0);
pub const RSI_SHORT_RANGE: (f64, f64) = (30.0, 60.0);
pub const IMBALANCE_THRESHOLD: f64 = 0.2;
pub const RELATED_THRESHOLD: f64 = 0.001;

/// Frames of a cohort, looked up by instrument.
#[derive(Debug, Default)]
pub struct FrameLookup<'a> {
    frames: HashMap<&'a str, &'a IndicatorFrame>,
}

impl<'a> FrameLookup<'a> {
    pub fn new(frames: &'a [IndicatorFrame]) -> Self {
        Self {
            frames: frames.iter().map(|f| (f.instrument.as_str(), f)).collect(),
        }
    }

    pub fn get(&self, instrument: &str) -> Option<&'a IndicatorFrame> {
        self.frames.get(instrument).copied()
    }
}

/// Per-step signals, aligned with the frame they were computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalSeries {
    pub long: Vec<bool>,
    pub short: Vec<bool>,
    pub related: Vec<f64>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.long.len()
    }

    pub fn is_empty(&self) -> bool {
        self.long.is_empty()
    }
}

pub fn generate_signals(
    frame: &IndicatorFrame,
    registry: &RelationshipRegistry,
    lookup: &FrameLookup,
) -> SignalSeries {
    let related = related_signal(frame, registry, lookup);
    let long = (0..frame.len()).map(|i| long_condition(frame, i, related[i])).collect();
    let short = (0..frame.len()).map(|i| short_condition(frame, i, related[i])).collect();
    SignalSeries { long, short, related }
}

/// Strength-weighted sum of counterparty returns, shifted by each
/// relationship's lead.
///
/// The counterparty is read as of the target's timestamp. A term that would
/// need a counterparty quote from after that timestamp contributes 0, as
/// does one falling before the counterparty's first return.
pub fn related_signal(
    frame: &IndicatorFrame,
    registry: &RelationshipRegistry,
    lookup: &FrameLookup,
) -> Vec<f64> {
    let mut related = vec![0.0; frame.len()];
    let target_times = frame.timestamps();

    for relationship in registry.for_instrument(&frame.instrument) {
        let Some((counterparty, shift)) = relationship.counterparty(&frame.instrument) else {
            continue;
        };
        let Some(other) = lookup.get(counterparty) else {
            continue;
        };
        let returns = other.returns();
        let asof = asof_indices(&target_times, &other.timestamps());

        for (t, current) in asof.iter().enumerate() {
            let Some(current) = current else {
                continue;
            };
            let Some(source) = (*current as i64).checked_sub(shift as i64) else {
                continue;
            };
            if source < 0 || source > *current as i64 {
                continue;
            }
            if let Some(ret) = returns[source as usize] {
                let term = ret * relationship.correlation * relationship.strength;
                related[t] += relationship.strength * term;
            }
        }
    }

    related
}

fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

fn within(value: Option<f64>, (low, high): (f64, f64)) -> bool {
    value.is_some_and(|v| v > low && v < high)
}

fn long_condition(f: &IndicatorFrame, i: usize, related: f64) -> bool {
    let mid = Some(f.mid_price[i]);
    gt(f.sma_20[i], f.sma_50[i])
        && gt(mid, f.sma_20[i])
        && within(f.rsi_14[i], RSI_LONG_RANGE)
        && gt(f.macd[i], f.macd_signal[i])
        && gt(f.volume_ratio[i], f.volume_ratio_sma_20[i])
        && gt(f.book_imbalance[i], Some(IMBALANCE_THRESHOLD))
        && gt(mid, f.bollinger_lower[i])
        && gt(f.atr_14[i], f.atr_mean_100[i])
        && related > RELATED_THRESHOLD
}

fn short_condition(f: &IndicatorFrame, i: usize, related: f64) -> bool {
    let mid = Some(f.mid_price[i]);
    lt(f.sma_20[i], f.sma_50[i])
        && lt(mid, f.sma_20[i])
        && within(f.rsi_14[i], RSI_SHORT_RANGE)
        && lt(f.macd[i], f.macd_signal[i])
        && lt(f.volume_ratio[i], f.volume_ratio_sma_20[i])
        && lt(f.book_imbalance[i], Some(-IMBALANCE_THRESHOLD))
        && lt(mid, f.bollinger_upper[i])
        && gt(f.atr_14[i], f.atr_mean_100[i])
        && related < -RELATED_THRESHOLD
}
