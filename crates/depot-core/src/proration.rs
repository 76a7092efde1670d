//! # Storage Duration Proration
//!
//! Converts the time between entry and exit into elapsed days and a whole
//! number of billable months.
//!
//! ## Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Both instants are reduced to their UTC calendar date.               │
//! │  2. days   = exit_date - entry_date, in whole days, clamped to >= 0     │
//! │  3. months = 1                 when days <= 30                          │
//! │            = ceil(days / 30)   otherwise                                │
//! │                                                                         │
//! │     days:    0 ... 30 │ 31 ... 60 │ 61 ... 90 │ ...                     │
//! │     months:      1    │     2     │     3     │ ...                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reducing to the calendar date first means 23:59 on day one and 00:01 on day
//! two are one day apart, and the time-of-day never shifts the month bucket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DAYS_PER_BILLING_MONTH;

/// Elapsed storage time for one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDuration {
    /// Whole calendar days, never negative.
    pub days: i64,
    /// Billable months, at least 1.
    pub months: i64,
}

/// Computes days and billable months between `entry` and `exit`.
///
/// An exit dated before the entry yields 0 days (and therefore 1 month).
///
/// ## Example
/// ```rust
/// use depot_core::proration::prorate;
/// use chrono::{TimeZone, Utc};
///
/// let entry = Utc.with_ymd_and_hms(2024, 5, 1, 22, 0, 0).unwrap();
/// let exit = Utc.with_ymd_and_hms(2024, 5, 11, 6, 0, 0).unwrap();
/// let d = prorate(entry, exit);
/// assert_eq!((d.days, d.months), (10, 1));
/// ```
pub fn prorate(entry: DateTime<Utc>, exit: DateTime<Utc>) -> StorageDuration {
    let days = (exit.date_naive() - entry.date_naive()).num_days().max(0);
    StorageDuration {
        days,
        months: months_for_days(days),
    }
}

/// Billable months for a day count.
#[inline]
pub fn months_for_days(days: i64) -> i64 {
    if days <= DAYS_PER_BILLING_MONTH {
        1
    } else {
        (days + DAYS_PER_BILLING_MONTH - 1) / DAYS_PER_BILLING_MONTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn exit() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_month_buckets() {
        for days in 0..=30 {
            assert_eq!(months_for_days(days), 1, "days = {days}");
        }
        assert_eq!(months_for_days(31), 2);
        assert_eq!(months_for_days(60), 2);
        assert_eq!(months_for_days(61), 3);
        assert_eq!(months_for_days(90), 3);
        assert_eq!(months_for_days(91), 4);
    }

    #[test]
    fn test_prorate_whole_days() {
        let d = prorate(exit() - Duration::days(45), exit());
        assert_eq!(d.days, 45);
        assert_eq!(d.months, 2);
    }

    #[test]
    fn test_exit_before_entry_clamps_to_zero() {
        let d = prorate(exit() + Duration::days(3), exit());
        assert_eq!(d.days, 0);
        assert_eq!(d.months, 1);
    }

    #[test]
    fn test_time_of_day_is_ignored() {
        let entry = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 0).unwrap();
        let exit = Utc.with_ymd_and_hms(2024, 1, 31, 0, 1, 0).unwrap();
        assert_eq!(prorate(entry, exit).days, 30);

        let exit = Utc.with_ymd_and_hms(2024, 2, 1, 0, 1, 0).unwrap();
        let d = prorate(entry, exit);
        assert_eq!(d.days, 31);
        assert_eq!(d.months, 2);
    }

    #[test]
    fn test_deterministic() {
        let entry = exit() - Duration::hours(1000);
        assert_eq!(prorate(entry, exit()), prorate(entry, exit()));
    }
}
