//! Next-occurrence calculation for recurring tasks.
//!
//! Shared by the tool server's `skip_occurrence` tool and the recurring
//! materializer consumer so both sides of the recurrence rule agree
//! (§4.3, §4.6). `daily`/`weekly` are calendar-day arithmetic; `monthly`/
//! `yearly` advance by calendar unit and then clamp the day-of-month to
//! the target month's length, which is what makes Jan 31 + 1 month land on
//! Feb 28 (or Feb 29 in a leap year) instead of overflowing into March.

use chrono::{Datelike, NaiveDateTime};

use crate::domain::task::RecurrencePattern;

/// Number of days in `(year, month)`, 1-indexed month.
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = chrono::NaiveDate::from_ymd_opt(next_year, next_month, 1).expect("valid calendar date");
    let first_of_this = chrono::NaiveDate::from_ymd_opt(year, month, 1).expect("valid calendar date");
    (first_of_next - first_of_this).num_days() as u32
}

fn add_months(dt: NaiveDateTime, months: i32) -> NaiveDateTime {
    let total_months = dt.year() * 12 + (dt.month() as i32 - 1) + months;
    let year = total_months.div_euclid(12);
    let month = (total_months.rem_euclid(12) + 1) as u32;
    let day = dt.day().min(days_in_month(year, month));
    let date = chrono::NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date");
    date.and_time(dt.time())
}

/// Compute the next occurrence of `base` advanced by `pattern` with
/// interval multiplier `every` (defaults to `1` when `every <= 0`).
pub fn calc_next(base: NaiveDateTime, pattern: RecurrencePattern, every: i32) -> NaiveDateTime {
    let every = if every <= 0 { 1 } else { every };
    match pattern {
        RecurrencePattern::Daily => base + chrono::Duration::days(every as i64),
        RecurrencePattern::Weekly => base + chrono::Duration::weeks(every as i64),
        RecurrencePattern::Monthly => add_months(base, every),
        RecurrencePattern::Yearly => add_months(base, every * 12),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn daily_advances_one_day() {
        let base = dt(2026, 1, 15, 10, 0);
        assert_eq!(calc_next(base, RecurrencePattern::Daily, 1), dt(2026, 1, 16, 10, 0));
    }

    #[test]
    fn weekly_advances_seven_days() {
        let base = dt(2026, 1, 15, 10, 0);
        assert_eq!(calc_next(base, RecurrencePattern::Weekly, 1), dt(2026, 1, 22, 10, 0));
    }

    #[test]
    fn monthly_from_jan_31_clamps_to_feb_28_in_non_leap_year() {
        let base = dt(2026, 1, 31, 9, 0);
        assert_eq!(calc_next(base, RecurrencePattern::Monthly, 1), dt(2026, 2, 28, 9, 0));
    }

    #[test]
    fn monthly_from_jan_31_clamps_to_feb_29_in_leap_year() {
        let base = dt(2024, 1, 31, 9, 0);
        assert_eq!(calc_next(base, RecurrencePattern::Monthly, 1), dt(2024, 2, 29, 9, 0));
    }

    #[test]
    fn yearly_from_feb_29_clamps_to_feb_28_in_non_leap_target() {
        let base = dt(2024, 2, 29, 9, 0);
        assert_eq!(calc_next(base, RecurrencePattern::Yearly, 1), dt(2025, 2, 28, 9, 0));
    }

    #[test]
    fn every_n_multiplier_applies() {
        let base = dt(2026, 1, 1, 0, 0);
        assert_eq!(calc_next(base, RecurrencePattern::Daily, 3), dt(2026, 1, 4, 0, 0));
        assert_eq!(calc_next(base, RecurrencePattern::Monthly, 2), dt(2026, 3, 1, 0, 0));
    }

    #[test]
    fn non_positive_every_defaults_to_one() {
        let base = dt(2026, 1, 1, 0, 0);
        assert_eq!(calc_next(base, RecurrencePattern::Daily, 0), dt(2026, 1, 2, 0, 0));
    }
}
