//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::NorthflowError;
use crate::domain::metrics::PerformanceSummary;
use std::path::Path;

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(
        &self,
        summary: &PerformanceSummary,
        result: &BacktestResult,
        output_path: &Path,
    ) -> Result<(), NorthflowError>;
}
