//! Date-indexed numeric series and price bars.
//!
//! A [`DatedSeries`] holds at most one observation per date with dates
//! strictly increasing. Gaps are allowed: consumers never assume every
//! trading day carries an observation.

use chrono::NaiveDate;
use std::fmt;

use super::error::NorthflowError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DatedPoint<T> {
    pub date: NaiveDate,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatedSeries<T = f64> {
    points: Vec<DatedPoint<T>>,
}

impl<T> Default for DatedSeries<T> {
    fn default() -> Self {
        Self { points: Vec::new() }
    }
}

impl<T> DatedSeries<T> {
    /// Build from points already in strictly increasing date order.
    pub fn new(points: Vec<DatedPoint<T>>) -> Result<Self, NorthflowError> {
        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(NorthflowError::UnsortedSeries { date: w[1].date });
        }
        Ok(Self { points })
    }

    /// Build from rows in any order. Duplicate dates are rejected.
    pub fn from_rows(rows: impl IntoIterator<Item = (NaiveDate, T)>) -> Result<Self, NorthflowError> {
        let mut points: Vec<DatedPoint<T>> = rows
            .into_iter()
            .map(|(date, value)| DatedPoint { date, value })
            .collect();
        points.sort_by_key(|p| p.date);
        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[DatedPoint<T>] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DatedPoint<T>> {
        self.points.iter()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn first(&self) -> Option<&DatedPoint<T>> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&DatedPoint<T>> {
        self.points.last()
    }

    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.points.binary_search_by_key(&date, |p| p.date).ok()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&T> {
        self.position(date).map(|i| &self.points[i].value)
    }

    /// Observations with `start <= date <= end`.
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> &[DatedPoint<T>] {
        let lo = self.points.partition_point(|p| p.date < start);
        let hi = self.points.partition_point(|p| p.date <= end);
        if lo >= hi { &[] } else { &self.points[lo..hi] }
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> DatedSeries<U> {
        DatedSeries {
            points: self
                .points
                .iter()
                .map(|p| DatedPoint {
                    date: p.date,
                    value: f(&p.value),
                })
                .collect(),
        }
    }

    /// Keep only dates present in both series, pairing their values.
    pub fn inner_join<U: Clone>(&self, other: &DatedSeries<U>) -> DatedSeries<(T, U)>
    where
        T: Clone,
    {
        let mut points = Vec::with_capacity(self.len().min(other.len()));
        let (mut i, mut j) = (0, 0);
        while i < self.points.len() && j < other.points.len() {
            let (a, b) = (&self.points[i], &other.points[j]);
            match a.date.cmp(&b.date) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    points.push(DatedPoint {
                        date: a.date,
                        value: (a.value.clone(), b.value.clone()),
                    });
                    i += 1;
                    j += 1;
                }
            }
        }
        DatedSeries { points }
    }

    pub(crate) fn from_sorted_unchecked(points: Vec<DatedPoint<T>>) -> Self {
        debug_assert!(points.windows(2).all(|w| w[0].date < w[1].date));
        Self { points }
    }
}

impl<'a, T> IntoIterator for &'a DatedSeries<T> {
    type Item = &'a DatedPoint<T>;
    type IntoIter = std::slice::Iter<'a, DatedPoint<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// Which daily price a trade executes at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    Close,
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceField::Open => write!(f, "open"),
            PriceField::Close => write!(f, "close"),
        }
    }
}

impl std::str::FromStr for PriceField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "open" => Ok(PriceField::Open),
            "close" => Ok(PriceField::Close),
            other => Err(format!("expected open or close, got {other:?}")),
        }
    }
}

/// Daily open/close of an index or fund.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub open: f64,
    pub close: f64,
}

impl PriceBar {
    pub fn price(&self, field: PriceField) -> f64 {
        match field {
            PriceField::Open => self.open,
            PriceField::Close => self.close,
        }
    }
}

pub type PriceSeries = DatedSeries<PriceBar>;
