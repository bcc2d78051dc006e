//! Single-pass PnL simulation over one instrument's frame.
//!
//! A [`Simulation`] moves Idle → Stepping → Done and never goes back. Each
//! step handles exactly one quote:
//!
//! 1. Close this instrument's positions whose stop or target is hit at mid.
//! 2. If the book has room, open at most one position. Long wins over short.
//! 3. Mark this instrument's open positions to mid and record the PnL.
//!
//! The book is passed into every step instead of being owned, so several
//! simulations can share one book on a merged timeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveTime;
use tracing::debug;

use crate::domain::error::PairtraderError;
use crate::domain::frame::IndicatorFrame;
use crate::domain::position::{ClosedTrade, Direction};
use crate::domain::position_book::PositionBook;
use crate::domain::risk::{plan_entry, RiskParams};
use crate::domain::signal::SignalSeries;

pub const DEFAULT_PORTFOLIO_VALUE: f64 = 1_000_000.0;

/// Cooperative cancellation flag, polled between simulation steps.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PnlRecord {
    pub timestamp: NaiveTime,
    pub pnl: f64,
    pub pnl_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationResult {
    pub instrument: String,
    pub records: Vec<PnlRecord>,
    pub closed_trades: Vec<ClosedTrade>,
}

impl SimulationResult {
    pub fn empty(instrument: &str) -> Self {
        SimulationResult {
            instrument: instrument.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationState {
    Idle,
    Stepping { next: usize },
    Done,
}

#[derive(Debug)]
pub struct Simulation<'a> {
    frame: &'a IndicatorFrame,
    signals: &'a SignalSeries,
    params: &'a RiskParams,
    portfolio_value: f64,
    state: SimulationState,
    records: Vec<PnlRecord>,
}

impl<'a> Simulation<'a> {
    pub fn new(
        frame: &'a IndicatorFrame,
        signals: &'a SignalSeries,
        params: &'a RiskParams,
        portfolio_value: f64,
    ) -> Result<Self, PairtraderError> {
        check_portfolio_value(portfolio_value)?;
        Ok(Simulation {
            frame,
            signals,
            params,
            portfolio_value,
            state: SimulationState::Idle,
            records: Vec::with_capacity(frame.len()),
        })
    }

    pub fn instrument(&self) -> &str {
        &self.frame.instrument
    }

    pub fn state(&self) -> SimulationState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == SimulationState::Done
    }

    pub fn completed_steps(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[PnlRecord] {
        &self.records
    }

    /// Process the next quote. Returns `None` once every quote has been
    /// simulated.
    pub fn step(&mut self, book: &mut PositionBook) -> Option<PnlRecord> {
        let index = match self.state {
            SimulationState::Idle => 0,
            SimulationState::Stepping { next } => next,
            SimulationState::Done => return None,
        };
        if index >= self.frame.len() {
            self.state = SimulationState::Done;
            return None;
        }

        let instrument = self.frame.instrument.as_str();
        let price = self.frame.mid_price[index];
        let timestamp = self.frame.quotes[index].timestamp;

        book.close_triggered(instrument, price, timestamp);

        if book.has_capacity() {
            let direction = if self.signals.long.get(index).copied().unwrap_or(false) {
                Some(Direction::Long)
            } else if self.signals.short.get(index).copied().unwrap_or(false) {
                Some(Direction::Short)
            } else {
                None
            };
            if let Some(plan) =
                direction.and_then(|d| plan_entry(self.frame, index, d, self.params, self.portfolio_value))
            {
                book.open(instrument, &plan, timestamp);
            }
        }

        let pnl = book.unrealized_pnl(instrument, price);
        let record = PnlRecord {
            timestamp,
            pnl,
            pnl_percentage: pnl / self.portfolio_value * 100.0,
        };
        self.records.push(record);

        self.state = if index + 1 < self.frame.len() {
            SimulationState::Stepping { next: index + 1 }
        } else {
            SimulationState::Done
        };
        Some(record)
    }

    pub fn into_records(self) -> Vec<PnlRecord> {
        self.records
    }
}

/// Percentages are taken against this value, so it must be finite and
/// positive.
pub fn check_portfolio_value(portfolio_value: f64) -> Result<(), PairtraderError> {
    if portfolio_value.is_finite() && portfolio_value > 0.0 {
        Ok(())
    } else {
        Err(PairtraderError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "portfolio_value".to_string(),
            reason: format!("portfolio_value must be positive, got {}", portfolio_value),
        })
    }
}

/// Run one instrument's simulation to completion against `book`.
///
/// Closed trades of this instrument are drained from the book into the
/// result; other instruments' trades stay where they are.
pub fn simulate_pnl(
    frame: &IndicatorFrame,
    signals: &SignalSeries,
    book: &mut PositionBook,
    params: &RiskParams,
    portfolio_value: f64,
    cancel: &CancelToken,
) -> Result<SimulationResult, PairtraderError> {
    let mut simulation = Simulation::new(frame, signals, params, portfolio_value)?;

    while !simulation.is_done() {
        if cancel.is_cancelled() {
            return Err(PairtraderError::Cancelled {
                completed: simulation.completed_steps(),
            });
        }
        simulation.step(book);
    }

    let closed_trades = book.take_closed_trades_for(&frame.instrument);
    debug!(
        instrument = %frame.instrument,
        steps = simulation.completed_steps(),
        trades = closed_trades.len(),
        "simulation complete"
    );

    Ok(SimulationResult {
        instrument: frame.instrument.clone(),
        records: simulation.into_records(),
        closed_trades,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::quote::Quote;
    use chrono::Duration;

    fn make_frame(instrument: &str, mids: &[f64]) -> IndicatorFrame {
        let start = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let quotes: Vec<Quote> = mids
            .iter()
            .enumerate()
            .map(|(i, &mid)| Quote {
                timestamp: start + Duration::seconds(i as i64),
                bid_price: mid - 1.0,
                ask_price: mid + 1.0,
                bid_volume: 10.0,
                ask_volume: 10.0,
            })
            .collect();
        IndicatorFrame::compute(instrument, &quotes).unwrap()
    }

    fn signals_at(len: usize, long: &[usize], short: &[usize]) -> SignalSeries {
        SignalSeries {
            long: (0..len).map(|i| long.contains(&i)).collect(),
            short: (0..len).map(|i| short.contains(&i)).collect(),
            related: vec![0.0; len],
        }
    }

    #[test]
    fn no_signals_flat_pnl() {
        let frame = make_frame("A", &[100.0; 50]);
        let signals = signals_at(50, &[], &[]);
        let mut book = PositionBook::default();
        let result = simulate_pnl(
            &frame,
            &signals,
            &mut book,
            &RiskParams::default(),
            DEFAULT_PORTFOLIO_VALUE,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(result.records.len(), 50);
        assert!(result.records.iter().all(|r| r.pnl == 0.0 && r.pnl_percentage == 0.0));
        assert_eq!(result.records[3].timestamp, frame.quotes[3].timestamp);
    }

    #[test]
    fn long_entry_marks_to_market() {
        // flat at 100 then up 1 per step; ATR 2 → stop 96, size 5000, target 108
        let mut mids = vec![100.0; 30];
        mids.extend((1..=5).map(|i| 100.0 + i as f64));
        let frame = make_frame("A", &mids);
        let signals = signals_at(mids.len(), &[29], &[]);
        let mut book = PositionBook::default();

        let result = simulate_pnl(
            &frame,
            &signals,
            &mut book,
            &RiskParams::default(),
            DEFAULT_PORTFOLIO_VALUE,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(result.records[29].pnl, 0.0);
        assert!((result.records[30].pnl - 5000.0).abs() < 1e-6);
        assert!((result.records[30].pnl_percentage - 0.5).abs() < 1e-9);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn exit_closes_before_pnl() {
        let mut mids = vec![100.0; 30];
        mids.extend([104.0, 109.0, 109.0]);
        let frame = make_frame("A", &mids);
        let signals = signals_at(mids.len(), &[29], &[]);
        let mut book = PositionBook::default();

        let result = simulate_pnl(
            &frame,
            &signals,
            &mut book,
            &RiskParams::default(),
            DEFAULT_PORTFOLIO_VALUE,
            &CancelToken::new(),
        )
        .unwrap();

        // target 108 hit at index 31; realized gains are not carried forward
        assert!((result.records[30].pnl - 20_000.0).abs() < 1e-6);
        assert_eq!(result.records[31].pnl, 0.0);
        assert_eq!(result.closed_trades.len(), 1);
        assert!((result.closed_trades[0].pnl - 45_000.0).abs() < 1e-6);
        assert!(book.is_empty());
    }

    #[test]
    fn long_preferred_over_short() {
        let frame = make_frame("A", &[100.0; 40]);
        let signals = signals_at(40, &[35], &[35]);
        let mut book = PositionBook::default();
        simulate_pnl(
            &frame,
            &signals,
            &mut book,
            &RiskParams::default(),
            DEFAULT_PORTFOLIO_VALUE,
            &CancelToken::new(),
        )
        .unwrap();

        assert_eq!(book.len(), 1);
        assert!(book.positions().all(|p| p.is_long()));
    }

    #[test]
    fn capacity_limits_entries() {
        let frame = make_frame("A", &[100.0; 40]);
        let signals = signals_at(40, &(30..40).collect::<Vec<_>>(), &[]);
        let mut book = PositionBook::new(3);
        simulate_pnl(
            &frame,
            &signals,
            &mut book,
            &RiskParams::default(),
            DEFAULT_PORTFOLIO_VALUE,
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(book.len(), 3);
    }

    #[test]
    fn state_machine_transitions() {
        let frame = make_frame("A", &[100.0; 30]);
        let signals = signals_at(30, &[], &[]);
        let params = RiskParams::default();
        let mut book = PositionBook::default();
        let mut simulation = Simulation::new(&frame, &signals, &params, DEFAULT_PORTFOLIO_VALUE).unwrap();

        assert_eq!(simulation.state(), SimulationState::Idle);
        assert!(simulation.step(&mut book).is_some());
        assert_eq!(simulation.state(), SimulationState::Stepping { next: 1 });

        while simulation.step(&mut book).is_some() {}
        assert!(simulation.is_done());
        assert_eq!(simulation.completed_steps(), 30);
        assert!(simulation.step(&mut book).is_none());
    }

    #[test]
    fn empty_frame_is_done_immediately() {
        let frame = IndicatorFrame::empty("A");
        let signals = SignalSeries::default();
        let result = simulate_pnl(
            &frame,
            &signals,
            &mut PositionBook::default(),
            &RiskParams::default(),
            DEFAULT_PORTFOLIO_VALUE,
            &CancelToken::new(),
        )
        .unwrap();
        assert!(result.records.is_empty());
    }

    #[test]
    fn cancelled_before_start() {
        let frame = make_frame("A", &[100.0; 30]);
        let signals = signals_at(30, &[], &[]);
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = simulate_pnl(
            &frame,
            &signals,
            &mut PositionBook::default(),
            &RiskParams::default(),
            DEFAULT_PORTFOLIO_VALUE,
            &cancel,
        )
        .unwrap_err();
        assert!(matches!(err, PairtraderError::Cancelled { completed: 0 }));
    }

    #[test]
    fn rejects_non_positive_portfolio_value() {
        let frame = make_frame("A", &[100.0; 30]);
        let signals = signals_at(30, &[], &[]);
        for value in [0.0, -1_000.0, f64::NAN, f64::INFINITY] {
            let mut book = PositionBook::default();
            let err = simulate_pnl(
                &frame,
                &signals,
                &mut book,
                &RiskParams::default(),
                value,
                &CancelToken::new(),
            )
            .unwrap_err();
            assert!(matches!(err, PairtraderError::ConfigInvalid { ref key, .. } if key == "portfolio_value"));

            let params = RiskParams::default();
            assert!(Simulation::new(&frame, &signals, &params, value).is_err());
        }
    }

    #[test]
    fn cancel_token_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
