//! Capacity-bounded set of open positions.

use std::collections::BTreeMap;

use chrono::NaiveTime;
use tracing::debug;

use super::position::{ClosedTrade, Position, PositionId};
use super::risk::EntryPlan;

pub const DEFAULT_MAX_POSITIONS: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct PositionBook {
    positions: BTreeMap<PositionId, Position>,
    closed_trades: Vec<ClosedTrade>,
    max_positions: usize,
    next_seq: u64,
}

impl Default for PositionBook {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POSITIONS)
    }
}

impl PositionBook {
    pub fn new(max_positions: usize) -> Self {
        PositionBook {
            positions: BTreeMap::new(),
            closed_trades: Vec::new(),
            max_positions,
            next_seq: 0,
        }
    }

    pub fn max_positions(&self) -> usize {
        self.max_positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn has_capacity(&self) -> bool {
        self.positions.len() < self.max_positions
    }

    pub fn get(&self, id: &PositionId) -> Option<&Position> {
        self.positions.get(id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn positions_for<'a>(&'a self, instrument: &'a str) -> impl Iterator<Item = &'a Position> {
        self.positions.values().filter(move |p| p.instrument == instrument)
    }

    /// Place a planned entry. `None` when the book is full.
    pub fn open(&mut self, instrument: &str, plan: &EntryPlan, entry_time: NaiveTime) -> Option<PositionId> {
        if !self.has_capacity() {
            return None;
        }

        let id = PositionId {
            direction: plan.direction,
            instrument: instrument.to_string(),
            seq: self.next_seq,
        };
        self.next_seq += 1;

        debug!(
            %id,
            entry_price = plan.entry_price,
            size = plan.size,
            stop_loss = plan.stop_loss,
            take_profit = plan.take_profit,
            "position opened"
        );

        self.positions.insert(
            id.clone(),
            Position {
                id: id.clone(),
                instrument: instrument.to_string(),
                entry_price: plan.entry_price,
                size: plan.size,
                entry_time,
                stop_loss: plan.stop_loss,
                take_profit: plan.take_profit,
            },
        );
        Some(id)
    }

    /// Close every position on `instrument` whose stop or target is hit at
    /// `price`. Returns the number closed.
    pub fn close_triggered(&mut self, instrument: &str, price: f64, time: NaiveTime) -> usize {
        let triggered: Vec<(PositionId, _)> = self
            .positions
            .values()
            .filter(|p| p.instrument == instrument)
            .filter_map(|p| p.exit_reason(price).map(|reason| (p.id.clone(), reason)))
            .collect();

        for (id, reason) in &triggered {
            if let Some(position) = self.positions.remove(id) {
                debug!(%id, %reason, price, "position closed");
                self.closed_trades.push(position.close(price, time, *reason));
            }
        }
        triggered.len()
    }

    /// Mark-to-market of `instrument`'s open positions at `price`.
    pub fn unrealized_pnl(&self, instrument: &str, price: f64) -> f64 {
        self.positions_for(instrument).map(|p| p.unrealized_pnl(price)).sum()
    }

    pub fn closed_trades(&self) -> &[ClosedTrade] {
        &self.closed_trades
    }

    pub fn take_closed_trades(&mut self) -> Vec<ClosedTrade> {
        std::mem::take(&mut self.closed_trades)
    }

    /// Drain the closed trades of one instrument, keeping the others.
    pub fn take_closed_trades_for(&mut self, instrument: &str) -> Vec<ClosedTrade> {
        let (taken, kept) = std::mem::take(&mut self.closed_trades)
            .into_iter()
            .partition(|t| t.instrument == instrument);
        self.closed_trades = kept;
        taken
    }
}
