//! crates/household_core/src/recurrence.rs
//!
//! Date arithmetic for recurring money items: rolling an expense schedule
//! or subscription forward by its billing frequency.

use chrono::{DateTime, Duration, Months, Utc};

use crate::domain::ExpenseFrequency;

/// The next occurrence after `from` for the given cadence.
///
/// One-time items re-use the monthly interval; callers decide whether a
/// follow-up occurrence is created at all. Month/year arithmetic clamps
/// to the last valid day (Jan 31 + 1 month = Feb 29/28).
pub fn next_occurrence(from: DateTime<Utc>, frequency: ExpenseFrequency) -> DateTime<Utc> {
    match frequency {
        ExpenseFrequency::Weekly => from + Duration::days(7),
        ExpenseFrequency::Yearly => from
            .checked_add_months(Months::new(12))
            .unwrap_or(from),
        ExpenseFrequency::Monthly | ExpenseFrequency::OneTime => from
            .checked_add_months(Months::new(1))
            .unwrap_or(from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn weekly_adds_seven_days() {
        assert_eq!(
            next_occurrence(day(2024, 3, 25), ExpenseFrequency::Weekly),
            day(2024, 4, 1)
        );
    }

    #[test]
    fn monthly_clamps_to_end_of_month() {
        assert_eq!(
            next_occurrence(day(2024, 1, 31), ExpenseFrequency::Monthly),
            day(2024, 2, 29)
        );
        assert_eq!(
            next_occurrence(day(2024, 4, 30), ExpenseFrequency::Monthly),
            day(2024, 5, 30)
        );
    }

    #[test]
    fn yearly_keeps_the_calendar_date() {
        assert_eq!(
            next_occurrence(day(2024, 6, 15), ExpenseFrequency::Yearly),
            day(2025, 6, 15)
        );
    }
}
