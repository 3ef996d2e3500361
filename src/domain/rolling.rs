//! Rolling-window statistics over dated series.
//!
//! Windows are counted in observations of the (possibly gapped) series, not in
//! calendar or trading days. The window ending at date `d` is the `window` most
//! recent observations up to and including `d`; dates with fewer observations
//! behind them are omitted rather than padded.

use super::error::NorthflowError;
use super::series::{DatedPoint, DatedSeries, PriceSeries};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanStd {
    pub mean: f64,
    /// Sample (n - 1) standard deviation.
    pub std: f64,
}

fn check_window(window: usize) -> Result<(), NorthflowError> {
    if window < 2 {
        return Err(NorthflowError::InvalidWindow { window });
    }
    Ok(())
}

pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; `None` for fewer than two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Pearson correlation of two equal-length slices; `None` when either side is flat.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    debug_assert_eq!(xs.len(), ys.len());
    let (mx, my) = (mean(xs), mean(ys));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

pub fn rolling_mean_std(
    series: &DatedSeries<f64>,
    window: usize,
) -> Result<DatedSeries<MeanStd>, NorthflowError> {
    check_window(window)?;
    let points = series.points();
    if points.len() < window {
        return Ok(DatedSeries::default());
    }

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let out = (window - 1..values.len())
        .map(|i| {
            let slice = &values[i + 1 - window..=i];
            DatedPoint {
                date: points[i].date,
                value: MeanStd {
                    mean: mean(slice),
                    std: sample_std(slice).unwrap_or(0.0),
                },
            }
        })
        .collect();
    Ok(DatedSeries::from_sorted_unchecked(out))
}

/// Rolling Pearson correlation over the date-wise inner join of `a` and `b`.
///
/// A window where either side has zero variance yields `None` at that date.
pub fn rolling_correlation(
    a: &DatedSeries<f64>,
    b: &DatedSeries<f64>,
    window: usize,
) -> Result<DatedSeries<Option<f64>>, NorthflowError> {
    check_window(window)?;
    let joined = a.inner_join(b);
    let points = joined.points();
    if points.len() < window {
        return Ok(DatedSeries::default());
    }

    let xs: Vec<f64> = points.iter().map(|p| p.value.0).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.value.1).collect();
    let out = (window - 1..points.len())
        .map(|i| {
            let start = i + 1 - window;
            DatedPoint {
                date: points[i].date,
                value: pearson(&xs[start..=i], &ys[start..=i]),
            }
        })
        .collect();
    Ok(DatedSeries::from_sorted_unchecked(out))
}

/// Correlate a flow series with an index's closing prices.
pub fn correlation_study(
    flow: &DatedSeries<f64>,
    prices: &PriceSeries,
    window: usize,
) -> Result<DatedSeries<Option<f64>>, NorthflowError> {
    let closes = prices.map(|bar| bar.close);
    rolling_correlation(flow, &closes, window)
}
