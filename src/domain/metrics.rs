//! Performance summary of a completed backtest.

use chrono::{Datelike, NaiveDate};

use super::backtest::{max_drawdown, BacktestResult, Drawdown};
use super::calendar::{Inclusive, TradingCalendar};
use super::error::NorthflowError;
use super::rolling::sample_std;
use super::series::DatedSeries;

pub const DEFAULT_TRADING_DAYS_PER_YEAR: u32 = 250;

/// Geometric annualisation over the trading days strictly between `start` and `end`.
pub fn annualize(
    calendar: &TradingCalendar,
    start: NaiveDate,
    end: NaiveDate,
    capital_before: f64,
    capital_after: f64,
    trading_days_per_year: u32,
) -> Result<f64, NorthflowError> {
    let t = calendar.count_trading_days(start, end, Inclusive::Neither);
    if t == 0 {
        return Err(NorthflowError::DivisionByZero { start, end });
    }
    let n = f64::from(trading_days_per_year) / t as f64;
    Ok((capital_after / capital_before).powf(n) - 1.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearSummary {
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_capital: f64,
    pub end_capital: f64,
    pub profit: f64,
    pub profit_rate: f64,
    /// Sample std of day-over-day returns of the equity curve within the year,
    /// `capital[i] / capital[i-1] - 1`. This is not the std of the cumulative
    /// in-period `DayProfit::profit_rate`, which drifts with the period's
    /// running gain. Unscaled.
    pub volatility: Option<f64>,
    pub max_drawdown: Option<Drawdown>,
}

/// Per-calendar-year figures from a dated capital series.
pub fn year_breakdown(equity_curve: &DatedSeries<f64>) -> Vec<YearSummary> {
    let points = equity_curve.points();
    points
        .chunk_by(|a, b| a.date.year() == b.date.year())
        .map(|year| {
            let first = &year[0];
            let last = &year[year.len() - 1];
            let start_capital = first.value;

            let daily: Vec<f64> = year
                .windows(2)
                .map(|w| w[1].value / w[0].value - 1.0)
                .collect();

            YearSummary {
                year: first.date.year(),
                start_date: first.date,
                end_date: last.date,
                start_capital,
                end_capital: last.value,
                profit: last.value - start_capital,
                profit_rate: last.value / start_capital - 1.0,
                volatility: sample_std(&daily),
                max_drawdown: max_drawdown(
                    year.iter().map(|p| (p.date, p.value / start_capital - 1.0)),
                ),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub total_profit: f64,
    pub total_profit_rate: f64,
    pub annualized_return: Option<f64>,
    /// Sample std of per-period profit rates, not scaled to a yearly figure.
    pub period_volatility: Option<f64>,
    pub periods_won: usize,
    pub periods_lost: usize,
    pub periods_skipped: usize,
    pub max_drawdown: Option<Drawdown>,
    pub years: Vec<YearSummary>,
}

impl PerformanceSummary {
    /// Summarise `result`. The annualised return spans the first settled
    /// period's entry to the last settled period's exit and is `None` when no
    /// period settled.
    pub fn compute(
        result: &BacktestResult,
        calendar: &TradingCalendar,
        trading_days_per_year: u32,
    ) -> Result<Self, NorthflowError> {
        let states = &result.period_states;
        let start_date = states.first().map(|s| s.period.entry);
        let end_date = states.last().map(|s| s.period.exit);
        let final_capital = result.final_capital();

        let annualized_return = match (start_date, end_date) {
            (Some(start), Some(end)) => Some(annualize(
                calendar,
                start,
                end,
                result.initial_capital,
                final_capital,
                trading_days_per_year,
            )?),
            _ => None,
        };

        let rates: Vec<f64> = states.iter().map(|s| s.profit_rate).collect();

        Ok(PerformanceSummary {
            start_date,
            end_date,
            initial_capital: result.initial_capital,
            final_capital,
            total_profit: result.total_profit,
            total_profit_rate: result.total_profit_rate,
            annualized_return,
            period_volatility: sample_std(&rates),
            periods_won: rates.iter().filter(|&&r| r > 0.0).count(),
            periods_lost: rates.iter().filter(|&&r| r < 0.0).count(),
            periods_skipped: result.skipped.len(),
            max_drawdown: result.max_drawdown,
            years: year_breakdown(&result.equity_curve()),
        })
    }
}
