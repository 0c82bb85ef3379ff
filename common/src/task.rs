// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::recurrence::RecurrenceFields;

/// Lifecycle state of a task.
///
/// Stored as lowercase text (`todo`, `completed`) both in the database and
/// in the JSON API.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Todo,
    Completed,
}

#[allow(clippy::doc_overindented_list_items)]
/// Represents a task within the system.
///
/// Derivation attributes (derive):
/// - `Serialize`, `Deserialize`: Allows conversion to/from JSON.
/// - `sqlx::FromRow`: Allows `sqlx` to create a `Task` instance directly
///    from a database result row. The recurrence columns are read into the
///    flattened `RecurrenceFields`.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub id: i64,

    pub user_id: i64,

    pub list_id: i64,

    pub title: String,

    pub description: String,

    // 0-3, one value per quadrant.
    pub priority: i32,

    pub status: TaskStatus,

    pub due_date: Option<DateTime<Utc>>,

    // Never later than `due_date` when both are set.
    pub reminder_time: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,

    pub is_recurring: bool,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub recurrence: RecurrenceFields,

    /// The task whose completion generated this one.
    pub parent_task_id: Option<i64>,

    pub created_at: DateTime<Utc>,

    pub deleted_at: Option<DateTime<Utc>>,
}

/// A task that has not been stored yet, so it has no identity.
///
/// The successor builder produces these and the persistence layer turns
/// them into `Task` rows.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct NewTask {
    pub user_id: i64,
    pub list_id: i64,
    pub title: String,
    pub description: String,
    pub priority: i32,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_time: Option<DateTime<Utc>>,
    pub is_recurring: bool,
    pub recurrence: RecurrenceFields,
    pub parent_task_id: Option<i64>,
}

/// Structure used to receive task creation data from the API.
/// It's a good practice to separate database models (`Task`)
/// from API models (`CreateTaskPayload`), as they may have different fields.
#[derive(Deserialize, Debug)]
pub struct CreateTaskPayload {
    pub user_id: i64,
    pub list_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(flatten)]
    pub recurrence: RecurrenceFields,
}

impl CreateTaskPayload {
    /// Converts the payload into an open, parentless task descriptor.
    pub fn into_new_task(self) -> NewTask {
        NewTask {
            user_id: self.user_id,
            list_id: self.list_id,
            title: self.title,
            description: self.description,
            priority: self.priority,
            status: TaskStatus::Todo,
            due_date: self.due_date,
            reminder_time: self.reminder_time,
            is_recurring: self.is_recurring,
            recurrence: self.recurrence.with_default_interval(self.is_recurring),
            parent_task_id: None,
        }
    }
}

/// Replacement values for the editable fields of an existing task.
/// `list_id` is optional: when absent the task stays in its current list.
#[derive(Deserialize, Debug)]
pub struct UpdateTaskPayload {
    pub list_id: Option<i64>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: i32,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(flatten)]
    pub recurrence: RecurrenceFields,
}

/// New priority for `PUT /api/tasks/{id}/priority`.
#[derive(Deserialize, Debug)]
pub struct UpdatePriorityPayload {
    pub priority: i32,
}

/// Body returned when a task is completed. `successor` is the next
/// instance of a recurring task, if one was generated.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CompleteTaskResponse {
    pub task: Task,
    pub successor: Option<Task>,
}
