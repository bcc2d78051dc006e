//! Cohort pipeline: indicators → relationships → signals → simulation →
//! metrics for a set of instruments traded together.
//!
//! Relationship analysis needs every frame of the cohort, so it is a hard
//! barrier between indicator computation and signal generation. An
//! instrument that fails validation is logged and carried through with
//! empty output; the rest of the cohort is unaffected.

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::domain::error::PairtraderError;
use crate::domain::frame::IndicatorFrame;
use crate::domain::metrics::Metrics;
use crate::domain::position_book::{PositionBook, DEFAULT_MAX_POSITIONS};
use crate::domain::quote::Quote;
use crate::domain::relationship::{analyze_relationships, AnalyzerConfig, RelationshipRegistry};
use crate::domain::risk::RiskParams;
use crate::domain::signal::{generate_signals, FrameLookup, SignalSeries};
use crate::domain::simulation::{
    check_portfolio_value, simulate_pnl, CancelToken, Simulation, SimulationResult,
    DEFAULT_PORTFOLIO_VALUE,
};
use crate::domain::timeline::unified_timeline;

/// How position capacity is shared across the cohort.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookMode {
    /// One book and one capacity limit for every instrument, stepped on a
    /// merged timeline.
    #[default]
    Shared,
    /// One book per instrument, simulated in parallel.
    Independent,
}

impl FromStr for BookMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(BookMode::Shared),
            "independent" => Ok(BookMode::Independent),
            other => Err(format!("unknown book mode '{}', expected shared or independent", other)),
        }
    }
}

impl fmt::Display for BookMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookMode::Shared => write!(f, "shared"),
            BookMode::Independent => write!(f, "independent"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub portfolio_value: f64,
    pub max_positions: usize,
    pub book_mode: BookMode,
    pub risk: RiskParams,
    pub analyzer: AnalyzerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            portfolio_value: DEFAULT_PORTFOLIO_VALUE,
            max_positions: DEFAULT_MAX_POSITIONS,
            book_mode: BookMode::default(),
            risk: RiskParams::default(),
            analyzer: AnalyzerConfig::default(),
        }
    }
}

/// Everything produced for one instrument.
#[derive(Debug, Clone)]
pub struct InstrumentOutput {
    pub frame: IndicatorFrame,
    pub signals: SignalSeries,
    pub result: SimulationResult,
    pub metrics: Metrics,
}

impl InstrumentOutput {
    pub fn instrument(&self) -> &str {
        &self.frame.instrument
    }
}

#[derive(Debug, Clone)]
pub struct CohortResult {
    pub registry: RelationshipRegistry,
    /// In input order.
    pub outputs: Vec<InstrumentOutput>,
}

impl CohortResult {
    pub fn output(&self, instrument: &str) -> Option<&InstrumentOutput> {
        self.outputs.iter().find(|o| o.instrument() == instrument)
    }
}

/// Compute every instrument's frame in parallel. Instruments that fail
/// validation get an empty frame.
pub fn compute_frames(quotes_by_instrument: &[(String, Vec<Quote>)]) -> Vec<IndicatorFrame> {
    quotes_by_instrument
        .par_iter()
        .map(|(instrument, quotes)| {
            IndicatorFrame::compute(instrument, quotes).unwrap_or_else(|e| {
                warn!(instrument = %instrument, error = %e, "instrument skipped");
                IndicatorFrame::empty(instrument)
            })
        })
        .collect()
}

pub fn run_cohort(
    quotes_by_instrument: &[(String, Vec<Quote>)],
    config: &EngineConfig,
    cancel: &CancelToken,
) -> Result<CohortResult, PairtraderError> {
    check_portfolio_value(config.portfolio_value)?;
    info!(instruments = quotes_by_instrument.len(), "computing indicators");
    let frames = compute_frames(quotes_by_instrument);

    info!("analyzing relationships");
    let registry = analyze_relationships(&frames, &config.analyzer);

    let lookup = FrameLookup::new(&frames);
    let signals: Vec<SignalSeries> = frames
        .par_iter()
        .map(|frame| generate_signals(frame, &registry, &lookup))
        .collect();

    info!(mode = %config.book_mode, "simulating");
    let results = match config.book_mode {
        BookMode::Shared => simulate_shared(&frames, &signals, config, cancel)?,
        BookMode::Independent => simulate_independent(&frames, &signals, config, cancel)?,
    };

    let outputs = frames
        .into_iter()
        .zip(signals)
        .zip(results)
        .map(|((frame, signals), result)| InstrumentOutput {
            metrics: Metrics::compute(&result.records),
            frame,
            signals,
            result,
        })
        .collect();

    Ok(CohortResult { registry, outputs })
}

fn simulate_shared(
    frames: &[IndicatorFrame],
    signals: &[SignalSeries],
    config: &EngineConfig,
    cancel: &CancelToken,
) -> Result<Vec<SimulationResult>, PairtraderError> {
    let mut book = PositionBook::new(config.max_positions);
    let mut simulations = frames
        .iter()
        .zip(signals)
        .map(|(frame, signals)| Simulation::new(frame, signals, &config.risk, config.portfolio_value))
        .collect::<Result<Vec<_>, _>>()?;

    let timeline = unified_timeline(&frames.iter().map(IndicatorFrame::timestamps).collect::<Vec<_>>());
    for (completed, event) in timeline.iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(PairtraderError::Cancelled { completed });
        }
        simulations[event.instrument].step(&mut book);
    }

    Ok(simulations
        .into_iter()
        .map(|simulation| {
            let instrument = simulation.instrument().to_string();
            SimulationResult {
                closed_trades: book.take_closed_trades_for(&instrument),
                records: simulation.into_records(),
                instrument,
            }
        })
        .collect())
}

fn simulate_independent(
    frames: &[IndicatorFrame],
    signals: &[SignalSeries],
    config: &EngineConfig,
    cancel: &CancelToken,
) -> Result<Vec<SimulationResult>, PairtraderError> {
    let results: Vec<Result<SimulationResult, PairtraderError>> = frames
        .par_iter()
        .zip(signals)
        .map(|(frame, signals)| {
            let mut book = PositionBook::new(config.max_positions);
            simulate_pnl(frame, signals, &mut book, &config.risk, config.portfolio_value, cancel)
        })
        .collect();

    let mut completed = 0;
    let mut cancelled = false;
    let mut finished = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok(result) => {
                completed += result.records.len();
                finished.push(result);
            }
            Err(PairtraderError::Cancelled { completed: partial }) => {
                completed += partial;
                cancelled = true;
            }
            Err(e) => return Err(e),
        }
    }

    if cancelled {
        Err(PairtraderError::Cancelled { completed })
    } else {
        Ok(finished)
    }
}
