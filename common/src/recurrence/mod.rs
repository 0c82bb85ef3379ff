// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.

//! Recurring-task scheduling.
//!
//! A recurring task carries its rule as a handful of plain columns
//! ([`RecurrenceFields`]). Before any date math happens those columns are
//! decoded into a [`RecurrenceRule`], whose [`RecurrenceKind`] selects the
//! resolver branch. Completing a recurring task hands it to
//! [`build_successor`], which resolves the next due date, applies the end
//! boundary, and describes the next instance of the chain.

pub mod boundary;
pub mod dates;
pub mod resolver;
pub mod successor;

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

pub use boundary::apply_end_boundary;
pub use resolver::compute_next_due_date;
pub use successor::{build_successor, build_successor_at};

/// Malformed recurrence data found while decoding a stored rule.
#[derive(Debug, thiserror::Error)]
pub enum RecurrenceError {
    #[error("recurrence weekdays {raw:?} are not a JSON array of integers: {source}")]
    MalformedWeekdays {
        raw: String,
        #[source]
        source: serde_json::Error,
    },
}

/// How a task repeats.
///
/// Anything the engine does not know, including an empty string, ends up in
/// `Unrecognized` and never produces a next date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Workday,
    /// Next weekend day. No public-holiday calendar is consulted.
    Holiday,
    /// Solar month arithmetic; lunar conversion is not implemented.
    LunarMonthly,
    /// Solar year arithmetic; lunar conversion is not implemented.
    LunarYearly,
    /// Every `interval` days.
    Custom,
    Unrecognized(String),
}

impl RecurrenceKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "daily" => Self::Daily,
            "weekly" => Self::Weekly,
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            "workday" => Self::Workday,
            "holiday" => Self::Holiday,
            "lunar_monthly" => Self::LunarMonthly,
            "lunar_yearly" => Self::LunarYearly,
            "custom" => Self::Custom,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Workday => "workday",
            Self::Holiday => "holiday",
            Self::LunarMonthly => "lunar_monthly",
            Self::LunarYearly => "lunar_yearly",
            Self::Custom => "custom",
            Self::Unrecognized(raw) => raw,
        }
    }
}

/// The recurrence columns of a task row, exactly as stored.
///
/// Successors receive a clone of these, so whatever the origin carried
/// (including a lunar date the engine ignores) survives the whole chain.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, sqlx::FromRow)]
#[serde(default)]
pub struct RecurrenceFields {
    pub recurrence_type: Option<String>,

    pub recurrence_interval: i64,

    // JSON array of weekday numbers, 0 = Sunday, e.g. "[1,3,5]".
    pub recurrence_weekdays: Option<String>,

    pub recurrence_month_day: Option<i64>,

    // "MM-DD"
    pub recurrence_lunar_date: Option<String>,

    pub recurrence_end_date: Option<DateTime<Utc>>,
}

impl RecurrenceFields {
    /// Recurring tasks saved without an interval repeat every 1 unit.
    pub fn with_default_interval(mut self, is_recurring: bool) -> Self {
        if is_recurring && self.recurrence_interval <= 0 {
            self.recurrence_interval = 1;
        }
        self
    }

    /// Decodes the stored columns into a rule the resolver can evaluate.
    pub fn decode(&self) -> Result<RecurrenceRule, RecurrenceError> {
        let kind = RecurrenceKind::parse(self.recurrence_type.as_deref().unwrap_or_default());

        let interval = if self.recurrence_interval <= 0 {
            1
        } else {
            u32::try_from(self.recurrence_interval).unwrap_or(u32::MAX)
        };

        let weekdays = match self.recurrence_weekdays.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => parse_weekdays(raw)?,
        };

        let month_day = self
            .recurrence_month_day
            .filter(|day| *day > 0)
            .map(|day| u32::try_from(day).unwrap_or(u32::MAX));

        Ok(RecurrenceRule {
            kind,
            interval,
            weekdays,
            month_day,
            lunar_date: self.recurrence_lunar_date.clone(),
            end_date: self.recurrence_end_date,
        })
    }
}

/// A decoded recurrence rule. `interval` is always at least 1.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurrenceRule {
    pub kind: RecurrenceKind,
    pub interval: u32,
    /// Only consulted by `Weekly`. `None` when no weekday set was given.
    /// A stored set whose numbers name no weekday decodes to `Some(vec![])`.
    pub weekdays: Option<Vec<Weekday>>,
    /// Only consulted by `Monthly`.
    pub month_day: Option<u32>,
    pub lunar_date: Option<String>,
    /// Inclusive upper bound for generated due dates.
    pub end_date: Option<DateTime<Utc>>,
}

impl RecurrenceRule {
    pub fn new(kind: RecurrenceKind, interval: u32) -> Self {
        Self {
            kind,
            interval: interval.max(1),
            weekdays: None,
            month_day: None,
            lunar_date: None,
            end_date: None,
        }
    }

    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays = Some(weekdays.into_iter().collect());
        self
    }

    pub fn with_month_day(mut self, month_day: u32) -> Self {
        self.month_day = Some(month_day);
        self
    }

    pub fn with_end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }
}

/// An empty array counts as no weekday set. Numbers outside 0..=6 name no
/// weekday and are skipped.
fn parse_weekdays(raw: &str) -> Result<Option<Vec<Weekday>>, RecurrenceError> {
    let numbers: Vec<i64> =
        serde_json::from_str(raw).map_err(|source| RecurrenceError::MalformedWeekdays {
            raw: raw.to_string(),
            source,
        })?;
    if numbers.is_empty() {
        return Ok(None);
    }

    Ok(Some(
        numbers
            .into_iter()
            .filter_map(weekday_from_sunday_index)
            .collect(),
    ))
}

fn weekday_from_sunday_index(number: i64) -> Option<Weekday> {
    match number {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}
