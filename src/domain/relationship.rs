//! Pairwise relationship analysis across a cohort of instruments.
//!
//! Every unordered pair of frames is aligned on exactly matching timestamps
//! and scored by correlation, lead-lag offset and a composite strength.
//! Pairs are independent of each other and are evaluated in parallel; the
//! registry is then assembled in pair order so repeated runs are identical.

use std::collections::HashMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::frame::IndicatorFrame;
use crate::domain::indicator::stddev::sample_stddev;
use crate::domain::timeline::align_exact;

pub const DEFAULT_MIN_CORRELATION: f64 = 0.7;
pub const DEFAULT_MIN_OVERLAP: usize = 100;
pub const DEFAULT_MAX_LAG: usize = 10;

const CORRELATION_WEIGHT: f64 = 0.4;
const VOLATILITY_WEIGHT: f64 = 0.3;
const TREND_WEIGHT: f64 = 0.3;
const LAG_TIE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub min_correlation: f64,
    pub min_overlap: usize,
    pub max_lag: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            min_correlation: DEFAULT_MIN_CORRELATION,
            min_overlap: DEFAULT_MIN_OVERLAP,
            max_lag: DEFAULT_MAX_LAG,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub instrument_a: String,
    pub instrument_b: String,
    pub correlation: f64,
    /// Positive when `instrument_a` leads `instrument_b`.
    pub lead_lag_offset: i32,
    pub strength: f64,
}

impl Relationship {
    pub fn involves(&self, instrument: &str) -> bool {
        self.instrument_a == instrument || self.instrument_b == instrument
    }

    /// The other side of the pair, with the number of periods it leads
    /// `target` by. `None` when `target` is not part of the pair.
    pub fn counterparty(&self, target: &str) -> Option<(&str, i32)> {
        if self.instrument_b == target {
            Some((&self.instrument_a, self.lead_lag_offset))
        } else if self.instrument_a == target {
            Some((&self.instrument_b, -self.lead_lag_offset))
        } else {
            None
        }
    }
}

/// Relationships found by one analysis pass. Each relationship is stored
/// once and indexed under both of its instruments.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    relationships: Vec<Relationship>,
    index: HashMap<String, Vec<usize>>,
}

impl RelationshipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, relationship: Relationship) {
        let slot = self.relationships.len();
        self.index
            .entry(relationship.instrument_a.clone())
            .or_default()
            .push(slot);
        if relationship.instrument_b != relationship.instrument_a {
            self.index
                .entry(relationship.instrument_b.clone())
                .or_default()
                .push(slot);
        }
        self.relationships.push(relationship);
    }

    pub fn for_instrument<'a>(&'a self, instrument: &str) -> impl Iterator<Item = &'a Relationship> + use<'a> {
        self.index
            .get(instrument)
            .into_iter()
            .flatten()
            .map(|&slot| &self.relationships[slot])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

/// Analyze every unordered pair of frames and keep the strongly correlated
/// ones.
pub fn analyze_relationships(frames: &[IndicatorFrame], config: &AnalyzerConfig) -> RelationshipRegistry {
    let pairs: Vec<(usize, usize)> = (0..frames.len())
        .flat_map(|i| ((i + 1)..frames.len()).map(move |j| (i, j)))
        .collect();

    let found: Vec<Option<Relationship>> = pairs
        .par_iter()
        .map(|&(i, j)| analyze_pair(&frames[i], &frames[j], config))
        .collect();

    let mut registry = RelationshipRegistry::new();
    for relationship in found.into_iter().flatten() {
        registry.insert(relationship);
    }

    info!(
        instruments = frames.len(),
        pairs = pairs.len(),
        relationships = registry.len(),
        "relationship analysis complete"
    );
    registry
}

/// Score a single pair. `None` when the overlap is too short or the
/// correlation too weak.
pub fn analyze_pair(a: &IndicatorFrame, b: &IndicatorFrame, config: &AnalyzerConfig) -> Option<Relationship> {
    let aligned = align_exact(&a.timestamps(), &b.timestamps());
    if aligned.len() < config.min_overlap || aligned.len() < 2 {
        debug!(
            a = %a.instrument,
            b = %b.instrument,
            overlap = aligned.len(),
            "pair skipped, insufficient overlap"
        );
        return None;
    }

    let prices_a: Vec<f64> = aligned.iter().map(|&(i, _)| a.mid_price[i]).collect();
    let prices_b: Vec<f64> = aligned.iter().map(|&(_, j)| b.mid_price[j]).collect();

    let correlation = pearson_correlation(&prices_a, &prices_b);
    if correlation.abs() < config.min_correlation {
        debug!(a = %a.instrument, b = %b.instrument, correlation, "pair below correlation threshold");
        return None;
    }

    let lead_lag_offset = lead_lag_offset(&prices_a, &prices_b, config.max_lag);
    let strength = relationship_strength(correlation, &prices_a, &prices_b);

    debug!(
        a = %a.instrument,
        b = %b.instrument,
        correlation,
        lead_lag_offset,
        strength,
        "relationship found"
    );

    Some(Relationship {
        instrument_a: a.instrument.clone(),
        instrument_b: b.instrument.clone(),
        correlation,
        lead_lag_offset,
        strength,
    })
}

/// Pearson correlation; 0 when either side is constant or fewer than two
/// points are given.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let mean_a = a.iter().sum::<f64>() / n as f64;
    let mean_b = b.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    if var_a == 0.0 || var_b == 0.0 {
        return 0.0;
    }
    (cov / (var_a.sqrt() * var_b.sqrt())).clamp(-1.0, 1.0)
}

/// Lag in `-max_lag..=max_lag` maximizing `|corr(a[t], b[t + lag])|`.
/// Smaller absolute lags win ties.
pub fn lead_lag_offset(a: &[f64], b: &[f64], max_lag: usize) -> i32 {
    let n = a.len().min(b.len());
    let max_lag = max_lag.min(i32::MAX as usize) as i32;

    // 0, -1, 1, -2, 2, ... so the first maximum found has the smallest |lag|
    let lags = std::iter::once(0).chain((1..=max_lag).flat_map(|m| [-m, m]));

    let mut best_lag = 0;
    let mut best_abs = f64::NEG_INFINITY;
    for lag in lags {
        let shift = lag.unsigned_abs() as usize;
        if shift >= n {
            continue;
        }
        let corr = if lag >= 0 {
            pearson_correlation(&a[..n - shift], &b[shift..n])
        } else {
            pearson_correlation(&a[shift..n], &b[..n - shift])
        };
        if corr.abs() > best_abs + LAG_TIE_TOLERANCE {
            best_abs = corr.abs();
            best_lag = lag;
        }
    }
    best_lag
}

/// `0.4·|corr| + 0.3·volatility_ratio + 0.3·trend_alignment`, clamped to
/// `[0, 1]`. Volatility compares the sample deviation of each side's
/// percentage returns.
pub fn relationship_strength(correlation: f64, a: &[f64], b: &[f64]) -> f64 {
    let std_a = sample_stddev(&pct_changes(a));
    let std_b = sample_stddev(&pct_changes(b));
    let max_std = std_a.max(std_b);
    let volatility_ratio = if max_std == 0.0 { 0.0 } else { std_a.min(std_b) / max_std };

    let strength = CORRELATION_WEIGHT * correlation.abs()
        + VOLATILITY_WEIGHT * volatility_ratio
        + TREND_WEIGHT * trend_alignment(a, b);
    strength.clamp(0.0, 1.0)
}

/// Fraction of steps where both series move in the same direction. A flat
/// step on both sides counts as agreement.
pub fn trend_alignment(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }
    let agreeing = (1..n)
        .filter(|&k| direction(a[k] - a[k - 1]) == direction(b[k] - b[k - 1]))
        .count();
    agreeing as f64 / (n - 1) as f64
}

fn direction(change: f64) -> i8 {
    if change > 0.0 {
        1
    } else if change < 0.0 {
        -1
    } else {
        0
    }
}

fn pct_changes(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}
