//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::cohort::{compute_frames, run_cohort, BookMode, EngineConfig};
use crate::domain::config_validation::{parse_instruments, validate_data_config, validate_engine_config};
use crate::domain::error::PairtraderError;
use crate::domain::frame::ensure_min_quotes;
use crate::domain::position_book::DEFAULT_MAX_POSITIONS;
use crate::domain::prediction::predict_price_changes;
use crate::domain::quote::Quote;
use crate::domain::relationship::{analyze_relationships, AnalyzerConfig};
use crate::domain::risk::RiskParams;
use crate::domain::simulation::CancelToken;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::QuoteSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "pairtrader", about = "Multi-instrument signal and PnL simulator")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline and simulate PnL for a cohort
    Simulate {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma separated instruments, overriding the config
        #[arg(short, long)]
        instruments: Option<String>,
        /// Directory receiving one PnL CSV per instrument
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Override [simulation] book_mode
        #[arg(long)]
        book_mode: Option<BookMode>,
    },
    /// Print the relationships found across a cohort
    Relationships {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        instruments: Option<String>,
    },
    /// Print projected bid prices at detected trend changes
    Predict {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        instrument: String,
    },
    /// Show quote and trade coverage per instrument
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        instruments: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Simulate {
            config,
            instruments,
            output,
            book_mode,
        } => run_simulate(&config, instruments.as_deref(), output.as_ref(), book_mode),
        Command::Relationships { config, instruments } => {
            run_relationships(&config, instruments.as_deref())
        }
        Command::Predict { config, instrument } => run_predict(&config, &instrument),
        Command::Info { config, instruments } => run_info(&config, instruments.as_deref()),
        Command::Validate { config } => run_validate(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = PairtraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn fail(err: &PairtraderError) -> ExitCode {
    eprintln!("error: {err}");
    err.into()
}

pub fn build_engine_config(adapter: &dyn ConfigPort) -> Result<EngineConfig, PairtraderError> {
    let book_mode = match adapter.get_string("simulation", "book_mode") {
        Some(mode) => mode
            .parse::<BookMode>()
            .map_err(|reason| PairtraderError::ConfigInvalid {
                section: "simulation".into(),
                key: "book_mode".into(),
                reason,
            })?,
        None => BookMode::default(),
    };

    let defaults = EngineConfig::default();
    Ok(EngineConfig {
        portfolio_value: adapter.get_double("simulation", "portfolio_value", defaults.portfolio_value),
        max_positions: adapter
            .get_int("simulation", "max_positions", DEFAULT_MAX_POSITIONS as i64)
            .max(0) as usize,
        book_mode,
        risk: RiskParams {
            risk_per_trade: adapter.get_double("simulation", "risk_per_trade", defaults.risk.risk_per_trade),
            min_rr_ratio: adapter.get_double("simulation", "min_rr_ratio", defaults.risk.min_rr_ratio),
            ..defaults.risk
        },
        analyzer: AnalyzerConfig {
            min_correlation: adapter.get_double(
                "relationships",
                "min_correlation",
                defaults.analyzer.min_correlation,
            ),
            min_overlap: adapter
                .get_int("relationships", "min_overlap", defaults.analyzer.min_overlap as i64)
                .max(0) as usize,
            max_lag: adapter
                .get_int("relationships", "max_lag", defaults.analyzer.max_lag as i64)
                .max(0) as usize,
        },
    })
}

/// Build the CSV data source for the configured data directory and period.
pub fn build_quote_source(adapter: &dyn ConfigPort) -> Result<CsvAdapter, PairtraderError> {
    let dir = adapter
        .get_string("data", "dir")
        .ok_or_else(|| PairtraderError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })?;
    let period = adapter
        .get_string("data", "period")
        .ok_or_else(|| PairtraderError::ConfigMissing {
            section: "data".into(),
            key: "period".into(),
        })?;
    Ok(CsvAdapter::new(dir, &period))
}

/// Command line list, then the configured list, then every instrument the
/// source knows about.
pub fn resolve_instruments(
    instrument_override: Option<&str>,
    config: &dyn ConfigPort,
    source: &dyn QuoteSource,
) -> Result<Vec<String>, PairtraderError> {
    if let Some(list) = instrument_override {
        return Ok(parse_instruments(list));
    }
    if let Some(list) = config.get_string("data", "instruments") {
        return Ok(parse_instruments(&list));
    }
    source.list_instruments()
}

/// Fetch quotes for every instrument, skipping the ones that fail to load.
pub fn load_cohort(source: &dyn QuoteSource, instruments: &[String]) -> Vec<(String, Vec<Quote>)> {
    let mut cohort = Vec::with_capacity(instruments.len());
    for instrument in instruments {
        match source.fetch_quotes(instrument) {
            Ok(quotes) => {
                eprintln!("  {}: {} quotes", instrument, quotes.len());
                if let Err(e) = ensure_min_quotes(instrument, &quotes) {
                    eprintln!("warning: {} (no signals will be generated)", e);
                }
                cohort.push((instrument.clone(), quotes));
            }
            Err(e) => eprintln!("warning: skipping {} ({})", instrument, e),
        }
    }
    cohort
}

/// At least one instrument must be long enough to produce a frame.
pub fn require_simulatable(cohort: &[(String, Vec<Quote>)]) -> Result<(), PairtraderError> {
    let Some((instrument, quotes)) = cohort.iter().max_by_key(|(_, quotes)| quotes.len()) else {
        return Ok(());
    };
    ensure_min_quotes(instrument, quotes)
}

fn load_validated(config_path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_data_config(&adapter).map_err(|e| fail(&e))?;
    validate_engine_config(&adapter).map_err(|e| fail(&e))?;
    Ok(adapter)
}

fn prepare_cohort(
    adapter: &FileConfigAdapter,
    instrument_override: Option<&str>,
) -> Result<Vec<(String, Vec<Quote>)>, ExitCode> {
    let source = build_quote_source(adapter).map_err(|e| fail(&e))?;
    let instruments =
        resolve_instruments(instrument_override, adapter, &source).map_err(|e| fail(&e))?;
    if instruments.is_empty() {
        eprintln!("error: no instruments configured");
        return Err(ExitCode::from(2));
    }

    eprintln!("Loading {} instruments from {}", instruments.len(), source.period_path().display());
    let cohort = load_cohort(&source, &instruments);
    if cohort.is_empty() {
        eprintln!("error: no instruments with data");
        return Err(ExitCode::from(5));
    }
    require_simulatable(&cohort).map_err(|e| fail(&e))?;
    Ok(cohort)
}

fn run_simulate(
    config_path: &PathBuf,
    instrument_override: Option<&str>,
    output_dir: Option<&PathBuf>,
    book_mode_override: Option<BookMode>,
) -> ExitCode {
    // Stage 1: Load and validate config
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let mut engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    if let Some(mode) = book_mode_override {
        engine_config.book_mode = mode;
    }

    // Stage 2: Load quotes
    let cohort = match prepare_cohort(&adapter, instrument_override) {
        Ok(c) => c,
        Err(code) => return code,
    };

    // Stage 3: Run the pipeline
    eprintln!(
        "Simulating {} instruments ({} book, max {} positions)",
        cohort.len(),
        engine_config.book_mode,
        engine_config.max_positions
    );
    let result = match run_cohort(&cohort, &engine_config, &CancelToken::new()) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    // Stage 4: Console summary
    eprintln!("\n=== Relationships: {} ===", result.registry.len());
    eprintln!("\n=== Per-Instrument Results ===");
    for output in &result.outputs {
        let m = &output.metrics;
        eprintln!(
            "  {}:  {} steps, {} trades, return {:.2} ({:.4}%), drawdown {:.2}%, sharpe {:.2}, win rate {:.1}%",
            output.instrument(),
            output.result.records.len(),
            output.result.closed_trades.len(),
            m.total_return,
            m.return_percentage,
            m.max_drawdown,
            m.sharpe_ratio,
            m.win_rate,
        );
    }

    if adapter.get_bool("output", "print_trades", false) {
        println!("instrument,size,entry_price,exit_price,entry_time,exit_time,pnl,reason");
        for output in &result.outputs {
            for t in &output.result.closed_trades {
                println!(
                    "{},{},{},{},{},{},{},{}",
                    t.instrument, t.size, t.entry_price, t.exit_price, t.entry_time, t.exit_time, t.pnl, t.reason
                );
            }
        }
    }

    // Stage 5: Write reports
    let output_dir = output_dir
        .cloned()
        .or_else(|| adapter.get_string("output", "dir").map(PathBuf::from));
    if let Some(dir) = output_dir {
        if let Err(e) = fs::create_dir_all(&dir) {
            return fail(&PairtraderError::from(e));
        }
        if let Err(e) = CsvReportAdapter.write_cohort(&result, &dir) {
            return fail(&e);
        }
        eprintln!("\nReports written to: {}", dir.display());
    }

    ExitCode::SUCCESS
}

fn run_relationships(config_path: &PathBuf, instrument_override: Option<&str>) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let cohort = match prepare_cohort(&adapter, instrument_override) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let frames = compute_frames(&cohort);
    let registry = analyze_relationships(&frames, &engine_config.analyzer);

    println!("instrument_a,instrument_b,correlation,lead_lag_offset,strength");
    for r in registry.iter() {
        println!(
            "{},{},{:.6},{},{:.6}",
            r.instrument_a, r.instrument_b, r.correlation, r.lead_lag_offset, r.strength
        );
    }
    eprintln!("{} relationships found", registry.len());
    ExitCode::SUCCESS
}

fn run_predict(config_path: &PathBuf, instrument: &str) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let source = match build_quote_source(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let quotes = match source.fetch_quotes(instrument) {
        Ok(q) => q,
        Err(e) => return fail(&e),
    };

    let predictions = predict_price_changes(&quotes);
    if predictions.is_empty() {
        eprintln!("No trend changes detected for {}", instrument);
        return ExitCode::SUCCESS;
    }

    println!("timestamp,predicted_price");
    for p in &predictions {
        println!("{},{}", p.timestamp.format("%H:%M:%S%.9f"), p.predicted_price);
    }
    eprintln!("{} predicted points", predictions.len());
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf, instrument_override: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let source = match build_quote_source(&adapter) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };
    let instruments = match resolve_instruments(instrument_override, &adapter, &source) {
        Ok(i) => i,
        Err(e) => return fail(&e),
    };

    for instrument in &instruments {
        match source.fetch_quotes(instrument) {
            Ok(quotes) if !quotes.is_empty() => {
                let trades = source.fetch_trades(instrument).map(|t| t.len()).unwrap_or(0);
                let first = quotes[0].timestamp;
                let last = quotes[quotes.len() - 1].timestamp;
                println!(
                    "{}: {} quotes, {} trades, {} to {}",
                    instrument,
                    quotes.len(),
                    trades,
                    first,
                    last
                );
            }
            Ok(_) => eprintln!("{}: no data found", instrument),
            Err(e) => eprintln!("error reading {}: {}", instrument, e),
        }
    }
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_validated(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    let engine_config = match build_engine_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let dir = adapter.get_string("data", "dir").unwrap_or_default();
    let period = adapter.get_string("data", "period").unwrap_or_default();
    let instruments = adapter
        .get_string("data", "instruments")
        .map(|list| parse_instruments(&list).join(", "))
        .unwrap_or_else(|| "(all in period)".to_string());

    eprintln!("\nData:");
    eprintln!("  source:      {}/{}", dir, period);
    eprintln!("  instruments: {}", instruments);
    eprintln!("\nSimulation:");
    eprintln!("  portfolio_value: {}", engine_config.portfolio_value);
    eprintln!("  risk_per_trade:  {}", engine_config.risk.risk_per_trade);
    eprintln!("  max_positions:   {}", engine_config.max_positions);
    eprintln!("  min_rr_ratio:    {}", engine_config.risk.min_rr_ratio);
    eprintln!("  book_mode:       {}", engine_config.book_mode);
    eprintln!("\nRelationships:");
    eprintln!("  min_correlation: {}", engine_config.analyzer.min_correlation);
    eprintln!("  min_overlap:     {}", engine_config.analyzer.min_overlap);
    eprintln!("  max_lag:         {}", engine_config.analyzer.max_lag);

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}
