//! CSV report adapter implementing ReportPort.
//!
//! One row per settled holding period, then three marker-led sections:
//! `skipped` (only when a period was skipped), `summary` as key/value rows,
//! and `years` with one row per calendar year.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::NorthflowError;
use crate::domain::metrics::PerformanceSummary;
use crate::ports::report_port::ReportPort;
use std::fs::File;
use std::path::Path;
use tracing::info;

const PERIOD_HEADER: [&str; 11] = [
    "entry_date",
    "exit_date",
    "entry_price",
    "exit_price",
    "shares",
    "capital_before",
    "capital_after",
    "profit",
    "profit_rate",
    "drawdown_date",
    "drawdown",
];

const SKIPPED_HEADER: [&str; 5] = ["entry_date", "exit_date", "missing_date", "field", "reason"];

const YEAR_HEADER: [&str; 10] = [
    "year",
    "start_date",
    "end_date",
    "start_capital",
    "end_capital",
    "profit",
    "profit_rate",
    "volatility",
    "drawdown_date",
    "drawdown",
];

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn write_to<W: std::io::Write>(
        writer: W,
        summary: &PerformanceSummary,
        result: &BacktestResult,
    ) -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

        wtr.write_record(PERIOD_HEADER)?;
        for state in &result.period_states {
            let (dd_date, dd_value) = match state.max_drawdown {
                Some(dd) => (dd.date.to_string(), dd.value.to_string()),
                None => (String::new(), String::new()),
            };
            wtr.write_record([
                state.period.entry.to_string(),
                state.period.exit.to_string(),
                state.entry_price.to_string(),
                state.exit_price.to_string(),
                state.shares.to_string(),
                state.capital_before.to_string(),
                state.capital_after.to_string(),
                state.profit.to_string(),
                state.profit_rate.to_string(),
                dd_date,
                dd_value,
            ])?;
        }

        if !result.skipped.is_empty() {
            wtr.write_record(["skipped"])?;
            wtr.write_record(SKIPPED_HEADER)?;
            for skip in &result.skipped {
                wtr.write_record([
                    skip.period.entry.to_string(),
                    skip.period.exit.to_string(),
                    skip.missing_date.to_string(),
                    skip.field.to_string(),
                    skip.reason.clone(),
                ])?;
            }
        }

        wtr.write_record(["summary"])?;
        let rows = [
            ("start_date", opt(summary.start_date)),
            ("end_date", opt(summary.end_date)),
            ("initial_capital", summary.initial_capital.to_string()),
            ("final_capital", summary.final_capital.to_string()),
            ("total_profit", summary.total_profit.to_string()),
            ("total_profit_rate", summary.total_profit_rate.to_string()),
            ("annualized_return", opt(summary.annualized_return)),
            ("period_volatility", opt(summary.period_volatility)),
            ("periods_won", summary.periods_won.to_string()),
            ("periods_lost", summary.periods_lost.to_string()),
            ("periods_skipped", summary.periods_skipped.to_string()),
            ("drawdown_date", opt(summary.max_drawdown.map(|dd| dd.date))),
            ("drawdown", opt(summary.max_drawdown.map(|dd| dd.value))),
        ];
        for (key, value) in rows {
            wtr.write_record([key.to_string(), value])?;
        }

        wtr.write_record(["years"])?;
        wtr.write_record(YEAR_HEADER)?;
        for year in &summary.years {
            wtr.write_record([
                year.year.to_string(),
                year.start_date.to_string(),
                year.end_date.to_string(),
                year.start_capital.to_string(),
                year.end_capital.to_string(),
                year.profit.to_string(),
                year.profit_rate.to_string(),
                opt(year.volatility),
                opt(year.max_drawdown.map(|dd| dd.date)),
                opt(year.max_drawdown.map(|dd| dd.value)),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        summary: &PerformanceSummary,
        result: &BacktestResult,
        output_path: &Path,
    ) -> Result<(), NorthflowError> {
        let file = File::create(output_path)?;
        Self::write_to(file, summary, result).map_err(|e| match e.into_kind() {
            csv::ErrorKind::Io(io) => NorthflowError::Io(io),
            other => NorthflowError::Data {
                reason: format!("CSV write error: {:?}", other),
            },
        })?;
        info!(
            path = %output_path.display(),
            periods = result.period_states.len(),
            skipped = summary.periods_skipped,
            "report written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::backtest::{run_backtest, BacktestConfig};
    use crate::domain::calendar::TradingCalendar;
    use crate::domain::periods::HoldingPeriod;
    use crate::domain::series::{DatedSeries, PriceBar, PriceField};
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn fixture() -> (BacktestResult, PerformanceSummary) {
        let cal = TradingCalendar::new(vec![d(4), d(5), d(6), d(7), d(8), d(11), d(12)]).unwrap();
        let prices = DatedSeries::from_rows(
            [(d(4), 100.0), (d(5), 90.0), (d(6), 110.0), (d(11), 120.0), (d(12), 125.0)]
                .into_iter()
                .map(|(date, p)| (date, PriceBar { open: p, close: p })),
        )
        .unwrap();
        let periods = [
            HoldingPeriod { entry: d(4), exit: d(6) },
            HoldingPeriod { entry: d(7), exit: d(8) },
            HoldingPeriod { entry: d(11), exit: d(12) },
        ];
        let config = BacktestConfig {
            initial_capital: 1000.0,
            execution_field: PriceField::Open,
        };
        let result = run_backtest(&prices, &periods, &config).unwrap();
        let summary = PerformanceSummary::compute(&result, &cal, 250).unwrap();
        (result, summary)
    }

    #[test]
    fn writes_periods_and_skipped_section() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        let (result, summary) = fixture();

        CsvReportAdapter::new().write(&summary, &result, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], PERIOD_HEADER.join(","));
        assert!(lines[1].starts_with("2024-03-04,2024-03-06,100,110,10,1000,"));
        assert!(lines[1].ends_with("2024-03-05,-0.1"));
        assert!(lines[2].starts_with("2024-03-11,2024-03-12,"));
        // no dip below entry in the last period
        assert!(lines[2].ends_with(",,"));
        assert_eq!(lines[3], "skipped");
        assert_eq!(lines[4], SKIPPED_HEADER.join(","));
        assert!(lines[5].starts_with("2024-03-07,2024-03-08,2024-03-07,open,"));
        assert_eq!(lines[6], "summary");
    }

    #[test]
    fn writes_summary_and_year_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        let (result, summary) = fixture();

        CsvReportAdapter::new().write(&summary, &result, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        let at = lines.iter().position(|l| *l == "summary").unwrap();
        let rows = &lines[at + 1..at + 14];
        assert_eq!(rows[0], "start_date,2024-03-04");
        assert_eq!(rows[1], "end_date,2024-03-12");
        assert_eq!(rows[2], "initial_capital,1000");
        assert!(rows[6].starts_with("annualized_return,"));
        assert_ne!(rows[6], "annualized_return,");
        assert_eq!(rows[8], "periods_won,2");
        assert_eq!(rows[9], "periods_lost,0");
        assert_eq!(rows[10], "periods_skipped,1");
        assert_eq!(rows[11], "drawdown_date,2024-03-05");
        assert_eq!(rows[12], "drawdown,-0.1");

        assert_eq!(lines[at + 14], "years");
        assert_eq!(lines[at + 15], YEAR_HEADER.join(","));
        assert!(lines[at + 16].starts_with("2024,2024-03-04,2024-03-12,1000,"));
        assert_eq!(lines.len(), at + 17);
    }

    #[test]
    fn no_skipped_section_when_all_settle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.csv");
        let (mut result, summary) = fixture();
        result.skipped.clear();

        CsvReportAdapter::new().write(&summary, &result, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(!lines.contains(&"skipped"));
        assert_eq!(lines[3], "summary");
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let (result, summary) = fixture();
        let err = CsvReportAdapter::new()
            .write(&summary, &result, Path::new("/nonexistent/dir/report.csv"))
            .unwrap_err();
        assert!(matches!(err, NorthflowError::Io(_)));
    }
}
