//! Report generation port.

use std::path::Path;

use crate::domain::cohort::CohortResult;
use crate::domain::error::PairtraderError;
use crate::domain::simulation::SimulationResult;

/// Port for writing simulation output.
pub trait ReportPort {
    fn write_pnl(&self, result: &SimulationResult, output_path: &Path) -> Result<(), PairtraderError>;

    /// Default implementation: one `<instrument>_pnl.csv` per instrument in
    /// `output_dir`.
    fn write_cohort(&self, result: &CohortResult, output_dir: &Path) -> Result<(), PairtraderError> {
        for output in &result.outputs {
            let path = output_dir.join(format!("{}_pnl.csv", output.instrument()));
            self.write_pnl(&output.result, &path)?;
        }
        Ok(())
    }
}
