//! Configuration validation.
//!
//! Validates every field the engine reads before any data is loaded.

use crate::domain::cohort::BookMode;
use crate::domain::error::PairtraderError;
use crate::ports::config_port::ConfigPort;

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    require_non_empty(config, "data", "dir")?;
    require_non_empty(config, "data", "period")?;
    validate_instruments(config)?;
    Ok(())
}

pub fn validate_engine_config(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    validate_portfolio_value(config)?;
    validate_risk_per_trade(config)?;
    validate_max_positions(config)?;
    validate_min_rr_ratio(config)?;
    validate_book_mode(config)?;
    validate_min_correlation(config)?;
    validate_min_overlap(config)?;
    validate_max_lag(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> PairtraderError {
    PairtraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn require_non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), PairtraderError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(PairtraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// Split a comma separated instrument list, dropping blanks and repeats.
/// First occurrence order is kept.
pub fn parse_instruments(value: &str) -> Vec<String> {
    let mut instruments: Vec<String> = Vec::new();
    for name in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !instruments.iter().any(|seen| seen == name) {
            instruments.push(name.to_string());
        }
    }
    instruments
}

/// An absent list means "every instrument in the period"; a present but
/// empty one is a mistake.
fn validate_instruments(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    match config.get_string("data", "instruments") {
        Some(list) if parse_instruments(&list).is_empty() => Err(invalid(
            "data",
            "instruments",
            "instruments must list at least one instrument",
        )),
        _ => Ok(()),
    }
}

fn validate_portfolio_value(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    let value = config.get_double("simulation", "portfolio_value", 1_000_000.0);
    if value <= 0.0 || !value.is_finite() {
        return Err(invalid("simulation", "portfolio_value", "portfolio_value must be positive"));
    }
    Ok(())
}

fn validate_risk_per_trade(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    let value = config.get_double("simulation", "risk_per_trade", 0.02);
    if value <= 0.0 || value >= 1.0 {
        return Err(invalid(
            "simulation",
            "risk_per_trade",
            "risk_per_trade must be between 0 and 1 (exclusive)",
        ));
    }
    Ok(())
}

fn validate_max_positions(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    let value = config.get_int("simulation", "max_positions", 3);
    if value < 1 {
        return Err(invalid("simulation", "max_positions", "max_positions must be at least 1"));
    }
    Ok(())
}

fn validate_min_rr_ratio(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    let value = config.get_double("simulation", "min_rr_ratio", 2.0);
    if value < 0.0 {
        return Err(invalid("simulation", "min_rr_ratio", "min_rr_ratio must be non-negative"));
    }
    Ok(())
}

fn validate_book_mode(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    if let Some(mode) = config.get_string("simulation", "book_mode") {
        mode.parse::<BookMode>()
            .map_err(|reason| invalid("simulation", "book_mode", &reason))?;
    }
    Ok(())
}

fn validate_min_correlation(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    let value = config.get_double("relationships", "min_correlation", 0.7);
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(
            "relationships",
            "min_correlation",
            "min_correlation must be between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_min_overlap(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    let value = config.get_int("relationships", "min_overlap", 100);
    if value < 1 {
        return Err(invalid("relationships", "min_overlap", "min_overlap must be at least 1"));
    }
    Ok(())
}

fn validate_max_lag(config: &dyn ConfigPort) -> Result<(), PairtraderError> {
    let value = config.get_int("relationships", "max_lag", 10);
    if value < 0 {
        return Err(invalid("relationships", "max_lag", "max_lag must be non-negative"));
    }
    Ok(())
}
