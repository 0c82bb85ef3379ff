// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Calendar helpers shared by every recurrence branch.
//!
//! All arithmetic is checked; `None` only comes back at the edge of the
//! range chrono can represent.

use chrono::{Datelike, Days, Months, NaiveDate, Weekday};

pub fn add_days(date: NaiveDate, days: u32) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
}

/// Adds calendar months, clamping the day to the end of the target month
/// (Jan 31 + 1 month = Feb 28 or 29).
///
/// Date libraries that normalize the overflow instead roll into the following
/// month (Jan 31 + 1 month = Mar 3). Due dates produced under that rule will
/// disagree with these near month ends.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Adds calendar years. Feb 29 lands on Feb 28 in a non-leap target year,
/// where overflow normalization would give Mar 1.
pub fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    add_months(date, years.checked_mul(12)?)
}

/// Number of days in `month` (1-12) of `year`.
pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    for day in (28..=31).rev() {
        if NaiveDate::from_ymd_opt(year, month, day).is_some() {
            return day;
        }
    }
    28
}

pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}
