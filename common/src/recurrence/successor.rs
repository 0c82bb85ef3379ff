// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, Utc};
use tracing::debug;

use super::{RecurrenceError, apply_end_boundary, compute_next_due_date};
use crate::{NewTask, Task, TaskStatus};

/// Builds the next instance of a recurring task that was just completed.
///
/// Tasks without a due date recur from the current time. See
/// [`build_successor_at`].
pub fn build_successor(completed: &Task) -> Result<Option<NewTask>, RecurrenceError> {
    build_successor_at(completed, Utc::now())
}

/// Builds the next instance of `completed`, using `now` as the reference
/// when the task has no due date.
///
/// `Ok(None)` ends the chain: the task is not recurring, its rule yields no
/// next date, or the next date lies past the rule's end date. An error means
/// the stored rule could not be decoded. Nothing is persisted here.
pub fn build_successor_at(
    completed: &Task,
    now: DateTime<Utc>,
) -> Result<Option<NewTask>, RecurrenceError> {
    if !completed.is_recurring {
        return Ok(None);
    }

    let rule = completed.recurrence.decode()?;
    let reference = completed.due_date.unwrap_or(now);

    let Some(candidate) = compute_next_due_date(&rule, reference) else {
        debug!(
            "Task {} has no next occurrence for rule kind {:?}.",
            completed.id,
            rule.kind.as_str()
        );
        return Ok(None);
    };

    let Some(next_due) = apply_end_boundary(candidate, rule.end_date) else {
        debug!(
            "Recurrence of task {} ends: {} is past end date {:?}.",
            completed.id, candidate, rule.end_date
        );
        return Ok(None);
    };

    // Keep the reminder the same distance ahead of the due date.
    let reminder_time = match (completed.due_date, completed.reminder_time) {
        (Some(due_date), Some(reminder_time)) => {
            next_due.checked_sub_signed(due_date - reminder_time)
        }
        _ => None,
    };

    Ok(Some(NewTask {
        user_id: completed.user_id,
        list_id: completed.list_id,
        title: completed.title.clone(),
        description: completed.description.clone(),
        priority: completed.priority,
        status: TaskStatus::Todo,
        due_date: Some(next_due),
        reminder_time,
        is_recurring: true,
        recurrence: completed.recurrence.clone(),
        parent_task_id: Some(completed.id),
    }))
}
