//! Summary statistics over a PnL series.
//!
//! Every metric is a pure function of the records; computing twice on the
//! same series gives identical results.

use super::indicator::stddev::sample_stddev;
use super::simulation::PnlRecord;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    /// Last PnL value.
    pub total_return: f64,
    /// Last PnL percentage.
    pub return_percentage: f64,
    /// Percent, reported as a positive number.
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    /// Percent of step-to-step PnL changes that are strictly positive.
    pub win_rate: f64,
}

impl Metrics {
    pub fn compute(records: &[PnlRecord]) -> Self {
        let pnl: Vec<f64> = records.iter().map(|r| r.pnl).collect();
        let pnl_pct: Vec<f64> = records.iter().map(|r| r.pnl_percentage).collect();

        Metrics {
            total_return: pnl.last().copied().unwrap_or(0.0),
            return_percentage: pnl_pct.last().copied().unwrap_or(0.0),
            max_drawdown: compute_max_drawdown(&pnl),
            sharpe_ratio: compute_sharpe(&pnl_pct),
            win_rate: compute_win_rate(&pnl),
        }
    }
}

/// Drawdown of the running sum of the PnL series, relative to its running
/// maximum. Each record already holds the full unrealized PnL of its step,
/// so the running sum counts an open position once per step it stays open.
/// Points where the running maximum is zero contribute 0.
pub fn compute_max_drawdown(pnl: &[f64]) -> f64 {
    let mut cumulative = 0.0;
    let mut running_max = f64::NEG_INFINITY;
    let mut min_drawdown = 0.0_f64;

    for (i, value) in pnl.iter().enumerate() {
        cumulative += value;
        running_max = running_max.max(cumulative);
        let drawdown = if running_max == 0.0 {
            0.0
        } else {
            (cumulative - running_max) / running_max * 100.0
        };
        min_drawdown = if i == 0 { drawdown } else { min_drawdown.min(drawdown) };
    }

    min_drawdown.abs()
}

/// Annualized mean over sample deviation of the percentage series.
pub fn compute_sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let stddev = sample_stddev(returns);
    if stddev == 0.0 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    mean / stddev * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn compute_win_rate(pnl: &[f64]) -> f64 {
    if pnl.len() < 2 {
        return 0.0;
    }
    let changes = pnl.len() - 1;
    let wins = pnl.windows(2).filter(|w| w[1] - w[0] > 0.0).count();
    wins as f64 / changes as f64 * 100.0
}
