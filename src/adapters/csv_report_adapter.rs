//! CSV report adapter: one row per simulated step.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::domain::error::PairtraderError;
use crate::domain::simulation::SimulationResult;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Serialize)]
struct PnlRow {
    timestamp: String,
    pnl: f64,
    pnl_percentage: f64,
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write_pnl(&self, result: &SimulationResult, output_path: &Path) -> Result<(), PairtraderError> {
        let to_err = |e: csv::Error| PairtraderError::ReportWrite {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        };

        let mut writer = csv::Writer::from_path(output_path).map_err(to_err)?;
        if result.records.is_empty() {
            writer
                .write_record(["timestamp", "pnl", "pnl_percentage"])
                .map_err(to_err)?;
        }
        for record in &result.records {
            writer
                .serialize(PnlRow {
                    timestamp: record.timestamp.format("%H:%M:%S%.9f").to_string(),
                    pnl: record.pnl,
                    pnl_percentage: record.pnl_percentage,
                })
                .map_err(to_err)?;
        }
        writer.flush()?;

        debug!(
            instrument = %result.instrument,
            rows = result.records.len(),
            path = %output_path.display(),
            "pnl report written"
        );
        Ok(())
    }
}
