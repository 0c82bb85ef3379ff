// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::database::{self, CompletionOutcome, DueWindow, TaskFilter};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use common::{
    CompleteTaskResponse, CreateTaskPayload, Task, TaskStatus, UpdatePriorityPayload,
    UpdateTaskPayload,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{debug, error, info};

/// Query string accepted by `GET /api/tasks`.
#[derive(Deserialize, Debug, Default)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub list_id: Option<i64>,
    /// `today`, `tomorrow` or `week`.
    #[serde(rename = "type")]
    pub due: Option<DueWindow>,
}

impl ListTasksQuery {
    fn into_filter(self) -> TaskFilter {
        TaskFilter {
            status: self.status.unwrap_or_default(),
            list_id: self.list_id,
            due: self.due,
        }
    }
}

/// Handler for listing tasks. Open tasks are listed unless `?status=` says otherwise.
pub async fn list_tasks(
    State(pool): State<SqlitePool>, // State injection (DB pool)
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<Vec<Task>>, AppError> {
    let filter = query.into_filter();
    let tasks = database::list_tasks_from_db(&pool, &filter, Utc::now()).await?;
    info!("Successfully retrieved {} tasks for {:?}.", tasks.len(), filter);
    Ok(Json(tasks))
}

/// Handler for creating a new task.
pub async fn create_task(
    State(pool): State<SqlitePool>,
    Json(payload): Json<CreateTaskPayload>, // Extracting the request body as JSON
) -> Result<(StatusCode, Json<Task>), AppError> {
    debug!(
        "Received request to create task '{}' for user {}",
        payload.title, payload.user_id
    );
    validate_task_fields(&payload.title, payload.due_date, payload.reminder_time)?;

    let new_task = database::create_task_in_db(&pool, payload.into_new_task()).await?;

    info!("Task created successfully with ID: {}", new_task.id);

    // Return a 201 Created status with the new task as JSON.
    Ok((StatusCode::CREATED, Json(new_task)))
}

/// Handler for fetching a task by ID.
pub async fn get_task(
    State(pool): State<SqlitePool>,
    Path(task_id): Path<i64>,
) -> Result<Json<Task>, AppError> {
    match database::get_task_from_db(&pool, task_id).await? {
        Some(task) => Ok(Json(task)),
        None => Err(AppError::task_not_found(task_id)),
    }
}

/// Handler for replacing the editable fields of a task.
pub async fn update_task(
    State(pool): State<SqlitePool>,
    Path(task_id): Path<i64>,
    Json(payload): Json<UpdateTaskPayload>,
) -> Result<Json<Task>, AppError> {
    debug!("Received request to update task with ID: {}", task_id);
    validate_task_fields(&payload.title, payload.due_date, payload.reminder_time)?;

    match database::update_task_in_db(&pool, task_id, payload).await? {
        Some(task) => {
            info!("Task with ID {} updated successfully.", task_id);
            Ok(Json(task))
        }
        None => Err(AppError::task_not_found(task_id)),
    }
}

/// Handler for changing only the priority of a task.
pub async fn update_task_priority(
    State(pool): State<SqlitePool>,
    Path(task_id): Path<i64>,
    Json(payload): Json<UpdatePriorityPayload>,
) -> Result<Json<Task>, AppError> {
    match database::update_task_priority_in_db(&pool, task_id, payload.priority).await? {
        Some(task) => {
            info!("Task with ID {} now has priority {}.", task_id, task.priority);
            Ok(Json(task))
        }
        None => Err(AppError::task_not_found(task_id)),
    }
}

/// Handler for deleting a task by ID.
pub async fn delete_task(
    State(pool): State<SqlitePool>,
    Path(task_id): Path<i64>, // Extract task ID from the URL path
) -> Result<StatusCode, AppError> {
    debug!("Attempting to delete task with ID: {}", task_id);

    let deleted = database::soft_delete_task_in_db(&pool, task_id).await?;

    if deleted {
        info!("Task with ID {} deleted successfully.", task_id);
        Ok(StatusCode::NO_CONTENT) // 204 No Content for successful deletion
    } else {
        error!("Task with ID {} not found for deletion.", task_id);
        Err(AppError::task_not_found(task_id))
    }
}

/// Handler for completing a task. Recurring tasks get their next
/// occurrence created in the same transaction.
pub async fn complete_task(
    State(pool): State<SqlitePool>,
    Path(task_id): Path<i64>,
) -> Result<Json<CompleteTaskResponse>, AppError> {
    debug!("Received request to complete task with ID: {}", task_id);

    match database::complete_task_in_db(&pool, task_id).await? {
        CompletionOutcome::Completed { task, successor } => {
            if let Some(successor) = &successor {
                info!(
                    "Task {} completed; next occurrence is task {}.",
                    task_id, successor.id
                );
            }
            Ok(Json(CompleteTaskResponse { task, successor }))
        }
        CompletionOutcome::AlreadyCompleted => Err(AppError::new(
            StatusCode::CONFLICT,
            &format!("Task with ID {task_id} is already completed."),
        )),
        CompletionOutcome::NotFound => Err(AppError::task_not_found(task_id)),
    }
}

/// Handler returning a task and every task that led to it, newest first.
pub async fn task_chain(
    State(pool): State<SqlitePool>,
    Path(task_id): Path<i64>,
) -> Result<Json<Vec<Task>>, AppError> {
    match database::get_task_chain_from_db(&pool, task_id).await? {
        Some(chain) => Ok(Json(chain)),
        None => Err(AppError::task_not_found(task_id)),
    }
}

fn validate_task_fields(
    title: &str,
    due_date: Option<DateTime<Utc>>,
    reminder_time: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    if title.trim().is_empty() {
        error!("Validation failed: Task title is empty.");
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "Task title cannot be empty.",
        ));
    }

    if let (Some(due_date), Some(reminder_time)) = (due_date, reminder_time) {
        if reminder_time > due_date {
            error!(
                "Validation failed: reminder {} is after due date {}.",
                reminder_time, due_date
            );
            return Err(AppError::new(
                StatusCode::BAD_REQUEST,
                "Reminder time cannot be later than the due date.",
            ));
        }
    }

    Ok(())
}

// --- Custom Error Handling ---
// Internal errors (e.g., from the database) become opaque 500 responses;
// client errors keep their message.

/// Our custom error type for the application.
#[derive(Debug)]
pub struct AppError {
    code: StatusCode,
    message: String,
}

impl AppError {
    fn new(code: StatusCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
        }
    }

    fn task_not_found(task_id: i64) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            &format!("Task with ID {task_id} not found."),
        )
    }
}

/// Allows converting an `anyhow::Error` (coming from `database.rs`)
/// into our `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        // Log the internal error for debugging.
        tracing::error!("Internal server error: {:?}", err);
        Self {
            code: StatusCode::INTERNAL_SERVER_ERROR,
            message: "An internal error occurred.".to_string(),
        }
    }
}

/// Allows Axum to convert our `AppError` into an HTTP `Response`.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(
            "Responding with error: status_code={}, message={}",
            self.code.as_u16(),
            self.message
        );
        (
            self.code,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}
