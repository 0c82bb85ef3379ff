// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, Utc};

/// Keeps `candidate` unless it falls strictly after `end_date`.
///
/// The boundary is inclusive, and a rule without an end date never rejects.
pub fn apply_end_boundary(
    candidate: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match end_date {
        Some(end_date) if candidate > end_date => None,
        _ => Some(candidate),
    }
}
