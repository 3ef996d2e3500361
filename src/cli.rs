//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestResult};
use crate::domain::calendar::TradingCalendar;
use crate::domain::config_validation::{validate_backtest_config, validate_signal_config};
use crate::domain::error::NorthflowError;
use crate::domain::metrics::PerformanceSummary;
use crate::domain::periods::{build_periods, HoldingPeriod};
use crate::domain::rolling::correlation_study;
use crate::domain::series::{DatedSeries, PriceField};
use crate::domain::signal::{band_signals, shift_signal_dates, BandSignals};
use crate::logging::init_logging;
use crate::ports::config_port::{ConfigPort, DATE_FORMAT};
use crate::ports::data_port::{DataPort, FlowField};
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "northflow", about = "Trade-day-aware backtester for capital-flow signals")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the band-signal backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Rolling correlation of the flow series against index closes
    Correlate {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        window: Option<usize>,
    },
    /// Move a date by a number of trading days
    Shift {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, value_parser = parse_cli_date)]
        date: NaiveDate,
        #[arg(long, allow_negative_numbers = true)]
        offset: i64,
        /// Snap a non-trading date forward to the next trading day first
        #[arg(long)]
        snap: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn parse_cli_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| format!("invalid date {raw:?}, expected YYYY-MM-DD"))
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Backtest {
            config,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest_command(&config, output.as_deref())
            }
        }
        Command::Correlate { config, window } => run_correlate(&config, window),
        Command::Shift {
            config,
            date,
            offset,
            snap,
        } => run_shift(&config, date, offset, snap),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load an INI file and install logging at its `[log] level`.
pub fn load_config(path: &Path) -> Result<FileConfigAdapter, NorthflowError> {
    let adapter = FileConfigAdapter::from_file(path)?;
    init_logging(adapter.get_string("log", "level").as_deref());
    info!(path = %path.display(), "config loaded");
    Ok(adapter)
}

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv { dir: PathBuf },
    Postgres,
}

/// Everything a backtest run needs, resolved from config.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub source: DataSource,
    pub code: String,
    pub flow: String,
    pub flow_field: FlowField,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub backtest: BacktestConfig,
    pub signal_lag: i64,
    pub trading_days_per_year: u32,
    pub window: usize,
    pub band_factor: f64,
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, NorthflowError> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| NorthflowError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        })
}

fn parsed<T: std::str::FromStr<Err = String>>(
    config: &dyn ConfigPort,
    key: &str,
) -> Result<Option<T>, NorthflowError> {
    config
        .get_string("backtest", key)
        .map(|raw| {
            raw.parse().map_err(|reason| NorthflowError::ConfigInvalid {
                section: "backtest".into(),
                key: key.into(),
                reason,
            })
        })
        .transpose()
}

fn config_date(config: &dyn ConfigPort, key: &str) -> Result<NaiveDate, NorthflowError> {
    match config.get_date("backtest", key) {
        Some(Ok(date)) => Ok(date),
        Some(Err(raw)) => Err(NorthflowError::ConfigInvalid {
            section: "backtest".into(),
            key: key.into(),
            reason: format!("invalid date {raw:?} (expected YYYY-MM-DD)"),
        }),
        None => Err(NorthflowError::ConfigMissing {
            section: "backtest".into(),
            key: key.into(),
        }),
    }
}

pub fn build_run_config(config: &dyn ConfigPort) -> Result<RunConfig, NorthflowError> {
    validate_backtest_config(config)?;

    let source = match config
        .get_string("data", "source")
        .map(|s| s.trim().to_lowercase())
        .as_deref()
    {
        Some("postgres") => DataSource::Postgres,
        _ => DataSource::Csv {
            dir: PathBuf::from(required(config, "data", "dir")?),
        },
    };

    Ok(RunConfig {
        source,
        code: required(config, "backtest", "code")?,
        flow: required(config, "backtest", "flow")?,
        flow_field: parsed(config, "flow_field")?.unwrap_or_default(),
        start_date: config_date(config, "start_date")?,
        end_date: config_date(config, "end_date")?,
        backtest: BacktestConfig {
            initial_capital: config.get_double("backtest", "initial_capital", 1_000_000.0),
            execution_field: parsed(config, "execution_price")?.unwrap_or(PriceField::Open),
        },
        signal_lag: config.get_int("backtest", "signal_lag", 1),
        // ranges checked by validate_backtest_config above
        trading_days_per_year: config.get_int("backtest", "trading_days_per_year", 250) as u32,
        window: config.get_int("signal", "window", 252) as usize,
        band_factor: config.get_double("signal", "band_factor", 1.5),
    })
}

pub fn open_data_port(
    config: &dyn ConfigPort,
    source: &DataSource,
) -> Result<Box<dyn DataPort>, NorthflowError> {
    match source {
        DataSource::Csv { dir } => Ok(Box::new(CsvAdapter::new(dir.clone()))),
        #[cfg(feature = "postgres")]
        DataSource::Postgres => {
            use crate::adapters::postgres_adapter::PostgresAdapter;
            Ok(Box::new(PostgresAdapter::from_config(config)?))
        }
        #[cfg(not(feature = "postgres"))]
        DataSource::Postgres => {
            let _ = config;
            Err(NorthflowError::ConfigInvalid {
                section: "data".into(),
                key: "source".into(),
                reason: "built without the postgres feature".into(),
            })
        }
    }
}

/// Intermediate and final products of one backtest run.
#[derive(Debug)]
pub struct PipelineOutput {
    pub calendar: TradingCalendar,
    pub signals: BandSignals,
    pub periods: Vec<HoldingPeriod>,
    pub result: BacktestResult,
    pub summary: PerformanceSummary,
}

/// Shift signals by `lag`, dropping those whose execution day falls past the
/// end of the loaded calendar. Dates the calendar does not know still fail.
fn executable_signal_dates(
    calendar: &TradingCalendar,
    dates: &[NaiveDate],
    lag: i64,
) -> Result<Vec<NaiveDate>, NorthflowError> {
    let len = calendar.len() as i64;
    let (executable, late): (Vec<NaiveDate>, Vec<NaiveDate>) = dates
        .iter()
        .partition(|&&d| calendar.position(d).is_none_or(|i| i as i64 + lag < len));
    if !late.is_empty() {
        warn!(
            count = late.len(),
            first = %late[0],
            "signals execute after the last loaded trading day; dropped"
        );
    }
    shift_signal_dates(calendar, &executable, lag)
}

pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    run: &RunConfig,
) -> Result<PipelineOutput, NorthflowError> {
    let calendar = TradingCalendar::load(data_port, run.start_date, run.end_date)?;
    let flow = data_port.fetch_flow(&run.flow, run.flow_field, run.start_date, run.end_date)?;
    let prices = data_port.fetch_prices(&run.code, run.start_date, run.end_date)?;
    info!(
        calendar_days = calendar.len(),
        flow_points = flow.len(),
        price_points = prices.len(),
        "data loaded"
    );

    let signals = band_signals(&flow, run.window, run.band_factor)?;
    let buys = executable_signal_dates(&calendar, &signals.buy_dates, run.signal_lag)?;
    let sells = executable_signal_dates(&calendar, &signals.sell_dates, run.signal_lag)?;
    info!(buys = buys.len(), sells = sells.len(), lag = run.signal_lag, "signals");

    let periods = build_periods(&buys, &sells)?;
    let result = run_backtest(&prices, &periods, &run.backtest)?;
    let summary = PerformanceSummary::compute(&result, &calendar, run.trading_days_per_year)?;
    info!(
        periods = result.period_states.len(),
        skipped = result.skipped.len(),
        final_capital = summary.final_capital,
        "backtest complete"
    );

    Ok(PipelineOutput {
        calendar,
        signals,
        periods,
        result,
        summary,
    })
}

fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

/// Console rendering of a finished backtest.
pub fn format_summary(summary: &PerformanceSummary, result: &BacktestResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== Holding Periods ===");
    for state in &result.period_states {
        let dd = match state.max_drawdown {
            Some(dd) => format!("{} on {}", pct(dd.value), dd.date),
            None => "no drawdown".to_string(),
        };
        let _ = writeln!(
            out,
            "  {}  {:.2} -> {:.2}  profit {:.2} ({})  capital {:.2}  max drawdown {}",
            state.period,
            state.entry_price,
            state.exit_price,
            state.profit,
            pct(state.profit_rate),
            state.capital_after,
            dd,
        );
    }
    for skip in &result.skipped {
        let _ = writeln!(out, "  {}  skipped: {}", skip.period, skip.reason);
    }

    let _ = writeln!(out, "\n=== Summary ===");
    if let (Some(start), Some(end)) = (summary.start_date, summary.end_date) {
        let _ = writeln!(out, "Span:               {} to {}", start, end);
    }
    let _ = writeln!(out, "Initial Capital:    {:.2}", summary.initial_capital);
    let _ = writeln!(out, "Final Capital:      {:.2}", summary.final_capital);
    let _ = writeln!(out, "Total Profit:       {:.2}", summary.total_profit);
    let _ = writeln!(out, "Total Return:       {}", pct(summary.total_profit_rate));
    match summary.annualized_return {
        Some(r) => {
            let _ = writeln!(out, "Annualized:         {}", pct(r));
        }
        None => {
            let _ = writeln!(out, "Annualized:         n/a");
        }
    }
    match summary.period_volatility {
        Some(v) => {
            let _ = writeln!(out, "Period Std (unscaled): {}", pct(v));
        }
        None => {
            let _ = writeln!(out, "Period Std (unscaled): n/a");
        }
    }
    let _ = writeln!(
        out,
        "Periods:            {} won, {} lost, {} skipped",
        summary.periods_won, summary.periods_lost, summary.periods_skipped
    );
    match summary.max_drawdown {
        Some(dd) => {
            let _ = writeln!(out, "Max Drawdown:       {} on {}", pct(dd.value), dd.date);
        }
        None => {
            let _ = writeln!(out, "Max Drawdown:       no drawdown");
        }
    }

    if !summary.years.is_empty() {
        let _ = writeln!(out, "\n=== Per-Year ===");
        let _ = writeln!(
            out,
            "  {:<6}{:>16}{:>16}{:>10}{:>10}{:>10}",
            "year", "start", "end", "return", "std", "drawdown"
        );
        for y in &summary.years {
            let std = y.volatility.map(pct).unwrap_or_else(|| "-".into());
            let dd = y.max_drawdown.map(|d| pct(d.value)).unwrap_or_else(|| "-".into());
            let _ = writeln!(
                out,
                "  {:<6}{:>16.2}{:>16.2}{:>10}{:>10}{:>10}",
                y.year,
                y.start_capital,
                y.end_capital,
                pct(y.profit_rate),
                std,
                dd,
            );
        }
    }

    out
}

/// Correlation rows as `date,correlation` CSV, with an empty cell for flat windows.
pub fn format_correlation(series: &DatedSeries<Option<f64>>) -> String {
    let mut out = String::from("date,correlation\n");
    for point in series {
        match point.value {
            Some(c) => {
                let _ = writeln!(out, "{},{}", point.date, c);
            }
            None => {
                let _ = writeln!(out, "{},", point.date);
            }
        }
    }
    out
}

fn run_backtest_command(config_path: &Path, output: Option<&Path>) -> Result<(), NorthflowError> {
    let adapter = load_config(config_path)?;
    let run = build_run_config(&adapter)?;
    let data_port = open_data_port(&adapter, &run.source)?;

    info!(
        code = %run.code,
        flow = %run.flow,
        start = %run.start_date,
        end = %run.end_date,
        "running backtest"
    );
    let out = run_backtest_pipeline(data_port.as_ref(), &run)?;
    print!("{}", format_summary(&out.summary, &out.result));

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("report.csv"));
    CsvReportAdapter::new().write(&out.summary, &out.result, &output)?;
    eprintln!("\nReport written to: {}", output.display());
    Ok(())
}

pub fn run_dry_run(config_path: &Path) -> Result<(), NorthflowError> {
    let adapter = load_config(config_path)?;
    let run = build_run_config(&adapter)?;

    eprintln!("Config validated successfully");
    match &run.source {
        DataSource::Csv { dir } => eprintln!("  data:      csv at {}", dir.display()),
        DataSource::Postgres => eprintln!("  data:      postgres"),
    }
    eprintln!("  code:      {}", run.code);
    eprintln!("  flow:      {} ({})", run.flow, run.flow_field);
    eprintln!("  range:     {} to {}", run.start_date, run.end_date);
    eprintln!("  capital:   {:.2}", run.backtest.initial_capital);
    eprintln!("  execution: {} price, lag {}", run.backtest.execution_field, run.signal_lag);
    eprintln!("  band:      window {}, factor {}", run.window, run.band_factor);
    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_correlate(config_path: &Path, window: Option<usize>) -> Result<(), NorthflowError> {
    let adapter = load_config(config_path)?;
    let run = build_run_config(&adapter)?;
    let window = window.unwrap_or(run.window);
    let data_port = open_data_port(&adapter, &run.source)?;

    let flow = data_port.fetch_flow(&run.flow, run.flow_field, run.start_date, run.end_date)?;
    let prices = data_port.fetch_prices(&run.code, run.start_date, run.end_date)?;
    let series = correlation_study(&flow, &prices, window)?;
    info!(rows = series.len(), window, "correlation computed");

    print!("{}", format_correlation(&series));
    Ok(())
}

fn run_shift(
    config_path: &Path,
    date: NaiveDate,
    offset: i64,
    snap: bool,
) -> Result<(), NorthflowError> {
    let adapter = load_config(config_path)?;
    let run = build_run_config(&adapter)?;
    let data_port = open_data_port(&adapter, &run.source)?;
    let calendar = TradingCalendar::load(data_port.as_ref(), run.start_date, run.end_date)?;

    let from = if snap {
        calendar
            .next_on_or_after(date)
            .ok_or(NorthflowError::OutOfRange { date, offset: 0 })?
    } else {
        date
    };
    println!("{}", calendar.shift(from, offset)?);
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), NorthflowError> {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = load_config(config_path)?;
    validate_backtest_config(&adapter)?;
    validate_signal_config(&adapter)?;
    eprintln!("Configuration is valid.");
    Ok(())
}
