//! Top-of-book quote and trade print representations.

use chrono::NaiveTime;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub timestamp: NaiveTime,
    pub bid_price: f64,
    pub ask_price: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
}

impl Quote {
    /// (bid + ask) / 2
    pub fn mid_price(&self) -> f64 {
        (self.bid_price + self.ask_price) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask_price - self.bid_price
    }

    /// max(ask - bid, |ask - prev_mid|, |bid - prev_mid|)
    pub fn true_range(&self, prev_mid: f64) -> f64 {
        let spread = self.spread();
        let ask_gap = (self.ask_price - prev_mid).abs();
        let bid_gap = (self.bid_price - prev_mid).abs();
        spread.max(ask_gap).max(bid_gap)
    }

    /// bid_volume / ask_volume, undefined for an empty ask side.
    pub fn volume_ratio(&self) -> Option<f64> {
        if self.ask_volume == 0.0 {
            None
        } else {
            Some(self.bid_volume / self.ask_volume)
        }
    }

    /// (bid_volume - ask_volume) / (bid_volume + ask_volume), undefined for an empty book.
    pub fn book_imbalance(&self) -> Option<f64> {
        let total = self.bid_volume + self.ask_volume;
        if total == 0.0 {
            None
        } else {
            Some((self.bid_volume - self.ask_volume) / total)
        }
    }
}

/// An executed trade print. Carried through the data port for reporting only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trade {
    pub timestamp: NaiveTime,
    pub price: f64,
    pub volume: f64,
}
