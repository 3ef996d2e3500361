//! Band-breakout signal generation on a flow series.
//!
//! Each observation is compared against a band built from the `window`
//! observations strictly before it: a value at or above `mean + factor * std`
//! is a buy signal, a value at or below `mean - factor * std` a sell signal.

use chrono::NaiveDate;

use super::calendar::TradingCalendar;
use super::error::NorthflowError;
use super::rolling::rolling_mean_std;
use super::series::{DatedPoint, DatedSeries};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub value: f64,
    pub mean: f64,
    pub upper: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BandSignals {
    pub buy_dates: Vec<NaiveDate>,
    pub sell_dates: Vec<NaiveDate>,
    pub bands: DatedSeries<Band>,
}

pub fn band_signals(
    series: &DatedSeries<f64>,
    window: usize,
    factor: f64,
) -> Result<BandSignals, NorthflowError> {
    let stats = rolling_mean_std(series, window)?;
    let points = series.points();

    let mut buy_dates = Vec::new();
    let mut sell_dates = Vec::new();
    let mut bands = Vec::with_capacity(stats.len());

    // stats[k] covers observations ..=k+window-1, so it bands observation k+window.
    for (k, stat) in stats.iter().enumerate() {
        let Some(obs) = points.get(k + window) else {
            break;
        };
        let band = Band {
            value: obs.value,
            mean: stat.value.mean,
            upper: stat.value.mean + factor * stat.value.std,
            lower: stat.value.mean - factor * stat.value.std,
        };
        if band.value >= band.upper {
            buy_dates.push(obs.date);
        }
        if band.value <= band.lower {
            sell_dates.push(obs.date);
        }
        bands.push(DatedPoint {
            date: obs.date,
            value: band,
        });
    }

    Ok(BandSignals {
        buy_dates,
        sell_dates,
        bands: DatedSeries::from_sorted_unchecked(bands),
    })
}

/// Move every signal date `lag` trading days, e.g. `1` to execute the session
/// after the signal is observed.
pub fn shift_signal_dates(
    calendar: &TradingCalendar,
    dates: &[NaiveDate],
    lag: i64,
) -> Result<Vec<NaiveDate>, NorthflowError> {
    dates.iter().map(|&d| calendar.shift(d, lag)).collect()
}
