//! Sequential full-position backtest over holding periods.
//!
//! Each period invests the whole running capital at the entry price and
//! liquidates at the exit price; the capital after one period is the capital
//! before the next. Fractional shares are allowed. A period whose entry or exit
//! price is missing, non-finite or not positive is skipped, recorded in
//! [`BacktestResult::skipped`], and leaves the capital unchanged.

use chrono::NaiveDate;
use tracing::{debug, warn};

use super::error::NorthflowError;
use super::periods::HoldingPeriod;
use super::series::{DatedPoint, DatedSeries, PriceField, PriceSeries};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub execution_field: PriceField,
}

/// Mark-to-close profit on one day of a holding period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayProfit {
    pub date: NaiveDate,
    pub profit: f64,
    pub profit_rate: f64,
}

/// Lowest cumulative profit rate reached, and when.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drawdown {
    pub date: NaiveDate,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodResult {
    pub period: HoldingPeriod,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: f64,
    pub capital_before: f64,
    pub capital_after: f64,
    pub profit: f64,
    pub profit_rate: f64,
    pub day_path: Vec<DayProfit>,
    pub max_drawdown: Option<Drawdown>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPeriod {
    pub period: HoldingPeriod,
    /// Day whose execution price was absent or unusable.
    pub missing_date: NaiveDate,
    pub field: PriceField,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub initial_capital: f64,
    pub execution_field: PriceField,
    pub period_states: Vec<PeriodResult>,
    pub skipped: Vec<SkippedPeriod>,
    pub total_profit: f64,
    pub total_profit_rate: f64,
    pub max_drawdown: Option<Drawdown>,
}

impl BacktestResult {
    pub fn final_capital(&self) -> f64 {
        self.period_states
            .last()
            .map(|p| p.capital_after)
            .unwrap_or(self.initial_capital)
    }

    /// Capital marked at each held day's close. Where one period exits on the
    /// day the next enters, the later period's mark wins.
    pub fn equity_curve(&self) -> DatedSeries<f64> {
        let mut points: Vec<DatedPoint<f64>> = Vec::new();
        for state in &self.period_states {
            for day in &state.day_path {
                let point = DatedPoint {
                    date: day.date,
                    value: state.capital_before + day.profit,
                };
                match points.last_mut() {
                    Some(last) if last.date == day.date => *last = point,
                    Some(last) if last.date > day.date => {}
                    _ => points.push(point),
                }
            }
        }
        DatedSeries::from_sorted_unchecked(points)
    }
}

/// Most negative `min(rate, 0)` along a path; `None` when nothing dips below zero.
pub fn max_drawdown(path: impl IntoIterator<Item = (NaiveDate, f64)>) -> Option<Drawdown> {
    let mut worst: Option<Drawdown> = None;
    for (date, rate) in path {
        if rate < 0.0 && worst.is_none_or(|w| rate < w.value) {
            worst = Some(Drawdown { date, value: rate });
        }
    }
    worst
}

fn lookup_price(
    prices: &PriceSeries,
    date: NaiveDate,
    field: PriceField,
) -> Result<f64, NorthflowError> {
    let value = prices
        .get(date)
        .map(|bar| bar.price(field))
        .ok_or(NorthflowError::MissingPriceData { date, field })?;
    if !(value.is_finite() && value > 0.0) {
        return Err(NorthflowError::InvalidPriceData { date, field, value });
    }
    Ok(value)
}

fn simulate_period(
    prices: &PriceSeries,
    period: HoldingPeriod,
    capital_before: f64,
    field: PriceField,
) -> Result<PeriodResult, NorthflowError> {
    let entry_price = lookup_price(prices, period.entry, field)?;
    let exit_price = lookup_price(prices, period.exit, field)?;

    let shares = capital_before / entry_price;
    let day_path: Vec<DayProfit> = prices
        .range(period.entry, period.exit)
        .iter()
        .map(|p| {
            let profit = p.value.close * shares - capital_before;
            DayProfit {
                date: p.date,
                profit,
                profit_rate: profit / capital_before,
            }
        })
        .collect();

    let profit = exit_price * shares - capital_before;
    let profit_rate = profit / capital_before;
    let max_drawdown = max_drawdown(day_path.iter().map(|d| (d.date, d.profit_rate)));

    Ok(PeriodResult {
        period,
        entry_price,
        exit_price,
        shares,
        capital_before,
        capital_after: capital_before * (1.0 + profit_rate),
        profit,
        profit_rate,
        day_path,
        max_drawdown,
    })
}

fn validate_periods(periods: &[HoldingPeriod]) -> Result<(), NorthflowError> {
    if periods.is_empty() {
        return Err(NorthflowError::InsufficientSignals {
            buy_count: 0,
            sell_count: 0,
        });
    }
    for p in periods {
        if p.entry >= p.exit {
            return Err(NorthflowError::InvalidPeriod {
                entry: p.entry,
                exit: p.exit,
            });
        }
    }
    if let Some(w) = periods.windows(2).find(|w| w[1].entry < w[0].exit) {
        return Err(NorthflowError::InvalidPeriod {
            entry: w[1].entry,
            exit: w[1].exit,
        });
    }
    Ok(())
}

pub fn run_backtest(
    prices: &PriceSeries,
    periods: &[HoldingPeriod],
    config: &BacktestConfig,
) -> Result<BacktestResult, NorthflowError> {
    if !(config.initial_capital.is_finite() && config.initial_capital > 0.0) {
        return Err(NorthflowError::ConfigInvalid {
            section: "backtest".into(),
            key: "initial_capital".into(),
            reason: "initial_capital must be positive".into(),
        });
    }
    validate_periods(periods)?;

    let mut capital = config.initial_capital;
    let mut period_states = Vec::with_capacity(periods.len());
    let mut skipped = Vec::new();

    for &period in periods {
        match simulate_period(prices, period, capital, config.execution_field) {
            Ok(state) => {
                debug!(
                    %period,
                    profit = state.profit,
                    profit_rate = state.profit_rate,
                    "period settled"
                );
                capital = state.capital_after;
                period_states.push(state);
            }
            Err(
                err @ (NorthflowError::MissingPriceData { date, field }
                | NorthflowError::InvalidPriceData { date, field, .. }),
            ) => {
                warn!(%period, missing = %date, "skipping period: {err}");
                skipped.push(SkippedPeriod {
                    period,
                    missing_date: date,
                    field,
                    reason: err.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }

    let total_profit = period_states.iter().map(|s| s.profit).sum();
    let total_profit_rate = capital / config.initial_capital - 1.0;
    let max_drawdown = period_states
        .iter()
        .filter_map(|s| s.max_drawdown)
        .fold(None, |worst: Option<Drawdown>, dd| match worst {
            Some(w) if w.value <= dd.value => Some(w),
            _ => Some(dd),
        });

    Ok(BacktestResult {
        initial_capital: config.initial_capital,
        execution_field: config.execution_field,
        period_states,
        skipped,
        total_profit,
        total_profit_rate,
        max_drawdown,
    })
}
