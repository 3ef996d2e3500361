//! Signal dates to holding periods.

use chrono::NaiveDate;
use std::fmt;

use super::error::NorthflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HoldingPeriod {
    pub entry: NaiveDate,
    pub exit: NaiveDate,
}

impl fmt::Display for HoldingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.entry, self.exit)
    }
}

/// Pair buy and sell signal dates into non-overlapping holding periods.
///
/// Starting from the earliest buy, the exit is the first sell strictly after
/// the entry, and the next entry is the first buy strictly after that exit.
/// The scan stops as soon as either side runs out.
pub fn build_periods(
    buy_dates: &[NaiveDate],
    sell_dates: &[NaiveDate],
) -> Result<Vec<HoldingPeriod>, NorthflowError> {
    if buy_dates.is_empty() || sell_dates.is_empty() {
        return Err(NorthflowError::InsufficientSignals {
            buy_count: buy_dates.len(),
            sell_count: sell_dates.len(),
        });
    }

    let mut buys = buy_dates.to_vec();
    let mut sells = sell_dates.to_vec();
    buys.sort_unstable();
    sells.sort_unstable();

    let mut periods = Vec::new();
    let mut entry = buys[0];
    loop {
        let exit_idx = sells.partition_point(|&d| d <= entry);
        let Some(&exit) = sells.get(exit_idx) else {
            break;
        };
        periods.push(HoldingPeriod { entry, exit });

        let next_idx = buys.partition_point(|&d| d <= exit);
        match buys.get(next_idx) {
            Some(&next) => entry = next,
            None => break,
        }
    }

    Ok(periods)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, day).unwrap()
    }

    fn period(entry: u32, exit: u32) -> HoldingPeriod {
        HoldingPeriod {
            entry: d(entry),
            exit: d(exit),
        }
    }

    #[test]
    fn alternating_signals() {
        let periods = build_periods(&[d(1), d(3), d(5)], &[d(2), d(4)]).unwrap();
        assert_eq!(periods, vec![period(1, 2), period(3, 4)]);
    }

    #[test]
    fn clustered_buys_collapse_to_first() {
        let periods = build_periods(&[d(1), d(2), d(3), d(8)], &[d(5), d(6), d(9)]).unwrap();
        assert_eq!(periods, vec![period(1, 5), period(8, 9)]);
    }

    #[test]
    fn sells_before_first_buy_are_ignored() {
        let periods = build_periods(&[d(10)], &[d(1), d(2), d(12)]).unwrap();
        assert_eq!(periods, vec![period(10, 12)]);
    }

    #[test]
    fn same_day_sell_does_not_close() {
        let periods = build_periods(&[d(4)], &[d(4), d(7)]).unwrap();
        assert_eq!(periods, vec![period(4, 7)]);
    }

    #[test]
    fn same_day_buy_does_not_reopen() {
        let periods = build_periods(&[d(1), d(4), d(5)], &[d(4), d(9)]).unwrap();
        assert_eq!(periods, vec![period(1, 4), period(5, 9)]);
    }

    #[test]
    fn no_sell_after_any_buy() {
        let periods = build_periods(&[d(20)], &[d(1)]).unwrap();
        assert!(periods.is_empty());
    }

    #[test]
    fn unsorted_input_is_sorted_first() {
        let periods = build_periods(&[d(5), d(1), d(3)], &[d(4), d(2)]).unwrap();
        assert_eq!(periods, vec![period(1, 2), period(3, 4)]);
    }

    #[test]
    fn empty_inputs_rejected() {
        let err = build_periods(&[], &[d(1)]).unwrap_err();
        assert!(matches!(
            err,
            NorthflowError::InsufficientSignals {
                buy_count: 0,
                sell_count: 1
            }
        ));
        assert!(build_periods(&[d(1)], &[]).is_err());
    }
}
