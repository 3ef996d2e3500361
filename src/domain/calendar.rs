//! Trading-day calendar.
//!
//! The calendar is loaded once at start-up and passed by reference to every
//! component that needs trade-day arithmetic. Offsets are positions in the
//! ordered set of trading days; non-trading calendar days are not addressable.

use chrono::NaiveDate;
use tracing::debug;

use super::error::NorthflowError;
use crate::ports::data_port::DataPort;

/// Which endpoints [`TradingCalendar::count_trading_days`] includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Inclusive {
    #[default]
    Neither,
    Start,
    End,
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradingCalendar {
    days: Vec<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(mut days: Vec<NaiveDate>) -> Result<Self, NorthflowError> {
        if days.is_empty() {
            return Err(NorthflowError::CalendarLoad {
                reason: "no trading days".into(),
            });
        }
        days.sort_unstable();
        days.dedup();
        Ok(Self { days })
    }

    /// Load the calendar for `[start, end]` from a data source.
    pub fn load(
        port: &dyn DataPort,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, NorthflowError> {
        let days = port
            .fetch_trade_days(start, end)
            .map_err(|e| NorthflowError::CalendarLoad {
                reason: e.to_string(),
            })?;
        let calendar = Self::new(days)?;
        debug!(
            days = calendar.len(),
            first = %calendar.first(),
            last = %calendar.last(),
            "trading calendar loaded"
        );
        Ok(calendar)
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn first(&self) -> NaiveDate {
        self.days[0]
    }

    pub fn last(&self) -> NaiveDate {
        self.days[self.days.len() - 1]
    }

    pub fn days(&self) -> &[NaiveDate] {
        &self.days
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.days.binary_search(&date).is_ok()
    }

    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.days.binary_search(&date).ok()
    }

    /// The trading day `n` positions after (`n > 0`) or before (`n < 0`) `date`.
    pub fn shift(&self, date: NaiveDate, n: i64) -> Result<NaiveDate, NorthflowError> {
        let idx = self
            .position(date)
            .ok_or(NorthflowError::UnknownDate { date })?;
        let target = (idx as i64)
            .checked_add(n)
            .filter(|&t| t >= 0 && (t as usize) < self.days.len())
            .ok_or(NorthflowError::OutOfRange { date, offset: n })?;
        Ok(self.days[target as usize])
    }

    /// First trading day on or after `date`, if the calendar reaches that far.
    pub fn next_on_or_after(&self, date: NaiveDate) -> Option<NaiveDate> {
        let idx = self.days.partition_point(|&d| d < date);
        self.days.get(idx).copied()
    }

    /// Number of trading days between `start` and `end`. Either bound may be a
    /// non-trading day; `inclusive` decides whether the bounds themselves count.
    pub fn count_trading_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        inclusive: Inclusive,
    ) -> usize {
        let lo = match inclusive {
            Inclusive::Start | Inclusive::Both => self.days.partition_point(|&d| d < start),
            Inclusive::Neither | Inclusive::End => self.days.partition_point(|&d| d <= start),
        };
        let hi = match inclusive {
            Inclusive::End | Inclusive::Both => self.days.partition_point(|&d| d <= end),
            Inclusive::Neither | Inclusive::Start => self.days.partition_point(|&d| d < end),
        };
        hi.saturating_sub(lo)
    }
}
