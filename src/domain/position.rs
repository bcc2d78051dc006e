//! Open positions and the trades they become on exit.

use std::fmt;

use chrono::NaiveTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> i64 {
        match self {
            Direction::Long => 1,
            Direction::Short => -1,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Key of an open position. `seq` comes from the owning book's counter and
/// is never reused within a run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionId {
    pub direction: Direction,
    pub instrument: String,
    pub seq: u64,
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.direction, self.instrument, self.seq)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub id: PositionId,
    pub instrument: String,
    pub entry_price: f64,
    /// Positive for long, negative for short.
    pub size: i64,
    pub entry_time: NaiveTime,
    pub stop_loss: f64,
    pub take_profit: f64,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.size > 0
    }

    pub fn is_short(&self) -> bool {
        self.size < 0
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.size as f64 * (price - self.entry_price)
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        if self.is_long() {
            price <= self.stop_loss
        } else {
            price >= self.stop_loss
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        if self.is_long() {
            price >= self.take_profit
        } else {
            price <= self.take_profit
        }
    }

    /// Stop-loss is checked first; both can only hold together on a
    /// malformed position.
    pub fn exit_reason(&self, price: f64) -> Option<ExitReason> {
        if self.should_stop_loss(price) {
            Some(ExitReason::StopLoss)
        } else if self.should_take_profit(price) {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }

    pub fn close(self, exit_price: f64, exit_time: NaiveTime, reason: ExitReason) -> ClosedTrade {
        ClosedTrade {
            pnl: self.unrealized_pnl(exit_price),
            instrument: self.instrument,
            size: self.size,
            entry_price: self.entry_price,
            exit_price,
            entry_time: self.entry_time,
            exit_time,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop_loss"),
            ExitReason::TakeProfit => write!(f, "take_profit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub instrument: String,
    pub size: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: NaiveTime,
    pub exit_time: NaiveTime,
    pub pnl: f64,
    pub reason: ExitReason,
}
