// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};

use super::dates::{add_days, add_months, add_years, is_weekend, last_day_of_month};
use super::{RecurrenceKind, RecurrenceRule};

// Days scanned when looking for a matching weekday. A set that names no
// weekday matches nothing and falls back to the next day.
const WEEKDAY_SEARCH_WINDOWS: [u32; 2] = [7, 14];

// Interval steps tried before the month-day search gives up.
const MAX_MONTH_DAY_STEPS: usize = 12;

/// Computes the next due date after `reference` for `rule`.
///
/// The calendar date moves according to the rule kind and the time of day
/// is kept. Returns `None` for unrecognized kinds. For every other kind the
/// result is strictly later than `reference`. The end boundary is not
/// applied here, see [`super::apply_end_boundary`].
pub fn compute_next_due_date(
    rule: &RecurrenceRule,
    reference: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let next = next_occurrence(rule, reference.date_naive())?;
    Some(next.and_time(reference.time()).and_utc())
}

/// Date-only form of [`compute_next_due_date`].
pub fn next_occurrence(rule: &RecurrenceRule, reference: NaiveDate) -> Option<NaiveDate> {
    let interval = rule.interval.max(1);

    match rule.kind {
        RecurrenceKind::Daily | RecurrenceKind::Custom => add_days(reference, interval),
        RecurrenceKind::Weekly => match &rule.weekdays {
            Some(weekdays) => next_matching_weekday(reference, weekdays),
            None => add_days(reference, interval.checked_mul(7)?),
        },
        RecurrenceKind::Monthly => match rule.month_day {
            Some(month_day) => next_month_day(reference, month_day, interval),
            None => add_months(reference, interval),
        },
        RecurrenceKind::Yearly | RecurrenceKind::LunarYearly => add_years(reference, interval),
        RecurrenceKind::LunarMonthly => add_months(reference, interval),
        RecurrenceKind::Workday => next_day_where(reference, |date| !is_weekend(date)),
        RecurrenceKind::Holiday => next_day_where(reference, is_weekend),
        RecurrenceKind::Unrecognized(_) => None,
    }
}

fn next_matching_weekday(reference: NaiveDate, weekdays: &[Weekday]) -> Option<NaiveDate> {
    for window in WEEKDAY_SEARCH_WINDOWS {
        for offset in 1..=window {
            let candidate = add_days(reference, offset)?;
            if weekdays.contains(&candidate.weekday()) {
                return Some(candidate);
            }
        }
    }
    add_days(reference, 1)
}

/// Moves `interval` months ahead and lands on `month_day`, or on the last
/// day of the target month when it is shorter.
fn next_month_day(reference: NaiveDate, month_day: u32, interval: u32) -> Option<NaiveDate> {
    let mut anchor = reference;
    for _ in 0..MAX_MONTH_DAY_STEPS {
        let (year, month) = shift_month(anchor.year(), anchor.month(), interval)?;
        let day = month_day.min(last_day_of_month(year, month));
        let candidate = NaiveDate::from_ymd_opt(year, month, day)?;
        if candidate > reference {
            return Some(candidate);
        }
        anchor = candidate;
    }
    None
}

fn shift_month(year: i32, month: u32, months: u32) -> Option<(i32, u32)> {
    let zero_based = i64::from(month) - 1 + i64::from(months);
    let year = i64::from(year) + zero_based / 12;
    let month = (zero_based % 12) as u32 + 1;
    Some((i32::try_from(year).ok()?, month))
}

fn next_day_where(reference: NaiveDate, accept: impl Fn(NaiveDate) -> bool) -> Option<NaiveDate> {
    reference.iter_days().skip(1).find(|date| accept(*date))
}
