// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use common::recurrence::build_successor_at;
use common::{NewTask, Task, TaskStatus, UpdateTaskPayload};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, migrate::MigrateDatabase};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

const TASKS_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        list_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        priority INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'todo',
        due_date TIMESTAMP NULL,
        reminder_time TIMESTAMP NULL,
        completed_at TIMESTAMP NULL,
        is_recurring BOOLEAN NOT NULL DEFAULT 0,
        recurrence_type TEXT NULL,
        recurrence_interval INTEGER NOT NULL DEFAULT 1,
        recurrence_weekdays TEXT NULL,
        recurrence_month_day INTEGER NULL,
        recurrence_lunar_date TEXT NULL,
        recurrence_end_date TIMESTAMP NULL,
        parent_task_id INTEGER NULL REFERENCES tasks(id),
        created_at TIMESTAMP NOT NULL,
        deleted_at TIMESTAMP NULL
    );
    CREATE INDEX IF NOT EXISTS idx_tasks_parent_task_id ON tasks(parent_task_id);
"#;

/// Due-date window for task listings, relative to the current UTC day.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DueWindow {
    /// Due between today's midnight and tomorrow's.
    Today,
    /// Due during the next calendar day.
    Tomorrow,
    /// Due no later than seven days from now, overdue tasks included.
    Week,
}

/// Which tasks a listing returns. Deleted tasks are never listed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFilter {
    pub status: TaskStatus,
    pub list_id: Option<i64>,
    pub due: Option<DueWindow>,
}

/// Result of completing a task.
#[derive(Debug)]
pub enum CompletionOutcome {
    NotFound,
    AlreadyCompleted,
    Completed {
        task: Task,
        successor: Option<Task>,
    },
}

/// Establishes the database connection pool.
/// If the database does not exist, it creates it (and its directory).
/// It also ensures the `tasks` table has the correct schema.
pub async fn establish_connection_pool(database_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        info!("Creating database {}", database_url);
        ensure_database_dir(database_url)?;
        Sqlite::create_database(database_url)
            .await
            .context("Failed to create database")?;
    } else {
        info!("Database already exists.");
    }

    let pool = SqlitePool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Creates the `tasks` table and its indexes if they are missing.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(TASKS_SCHEMA)
        .execute(pool)
        .await
        .context("Failed to create 'tasks' table")?;

    info!("'tasks' table is ready.");
    Ok(())
}

fn ensure_database_dir(database_url: &str) -> Result<()> {
    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return Ok(());
    }

    if let Some(dir) = Path::new(path).parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }
    Ok(())
}

/// Retrieves the non-deleted tasks matching `filter`, earliest due date
/// first (undated tasks last), then by priority.
///
/// Due-date windows are computed from `now`; tasks without a due date never
/// fall inside one.
pub async fn list_tasks_from_db(
    pool: &SqlitePool,
    filter: &TaskFilter,
    now: DateTime<Utc>,
) -> Result<Vec<Task>> {
    let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM tasks WHERE deleted_at IS NULL");
    query.push(" AND status = ").push_bind(filter.status);

    if let Some(list_id) = filter.list_id {
        query.push(" AND list_id = ").push_bind(list_id);
    }

    let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    match filter.due {
        Some(DueWindow::Today) => {
            query
                .push(" AND due_date >= ")
                .push_bind(start_of_day)
                .push(" AND due_date < ")
                .push_bind(start_of_day + Duration::days(1));
        }
        Some(DueWindow::Tomorrow) => {
            query
                .push(" AND due_date >= ")
                .push_bind(start_of_day + Duration::days(1))
                .push(" AND due_date < ")
                .push_bind(start_of_day + Duration::days(2));
        }
        Some(DueWindow::Week) => {
            query
                .push(" AND due_date <= ")
                .push_bind(now + Duration::days(7));
        }
        None => {}
    }

    query.push(" ORDER BY due_date ASC NULLS LAST, priority ASC, id ASC");

    let tasks = query
        .build_query_as::<Task>()
        .fetch_all(pool)
        .await
        .context("Failed to retrieve tasks from DB")?;

    Ok(tasks)
}

/// Fetches a single non-deleted task.
pub async fn get_task_from_db(pool: &SqlitePool, task_id: i64) -> Result<Option<Task>> {
    let mut conn = pool
        .acquire()
        .await
        .context("Failed to acquire a DB connection")?;
    fetch_live_task(&mut conn, task_id).await
}

/// Inserts a new task into the database.
pub async fn create_task_in_db(pool: &SqlitePool, new_task: NewTask) -> Result<Task> {
    let mut conn = pool
        .acquire()
        .await
        .context("Failed to acquire a DB connection")?;
    insert_task(&mut conn, new_task).await
}

/// Replaces the editable fields of a task.
/// Returns `None` if no live task with the given ID exists.
#[allow(clippy::uninlined_format_args)]
pub async fn update_task_in_db(
    pool: &SqlitePool,
    task_id: i64,
    payload: UpdateTaskPayload,
) -> Result<Option<Task>> {
    let recurrence = payload
        .recurrence
        .with_default_interval(payload.is_recurring);

    let result = sqlx::query(
        r#"
        UPDATE tasks SET
            list_id = COALESCE(?, list_id),
            title = ?,
            description = ?,
            priority = ?,
            due_date = ?,
            reminder_time = ?,
            is_recurring = ?,
            recurrence_type = ?,
            recurrence_interval = ?,
            recurrence_weekdays = ?,
            recurrence_month_day = ?,
            recurrence_lunar_date = ?,
            recurrence_end_date = ?
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(payload.list_id)
    .bind(&payload.title)
    .bind(&payload.description)
    .bind(payload.priority)
    .bind(payload.due_date)
    .bind(payload.reminder_time)
    .bind(payload.is_recurring)
    .bind(&recurrence.recurrence_type)
    .bind(recurrence.recurrence_interval)
    .bind(&recurrence.recurrence_weekdays)
    .bind(recurrence.recurrence_month_day)
    .bind(&recurrence.recurrence_lunar_date)
    .bind(recurrence.recurrence_end_date)
    .bind(task_id)
    .execute(pool)
    .await
    .context(format!("Failed to update task with ID: {}", task_id))?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_task_from_db(pool, task_id).await
}

/// Changes only the priority of a task.
/// Returns `None` if no live task with the given ID exists.
pub async fn update_task_priority_in_db(
    pool: &SqlitePool,
    task_id: i64,
    priority: i32,
) -> Result<Option<Task>> {
    let result = sqlx::query("UPDATE tasks SET priority = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(priority)
        .bind(task_id)
        .execute(pool)
        .await
        .context(format!("Failed to update priority of task with ID: {task_id}"))?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }

    get_task_from_db(pool, task_id).await
}

/// Soft deletes a task from the database by setting its `deleted_at` timestamp.
/// Returns true if a task was updated, false if no task with the given ID was found.
#[allow(clippy::uninlined_format_args)]
pub async fn soft_delete_task_in_db(pool: &SqlitePool, task_id: i64) -> Result<bool> {
    debug!("Attempting to soft delete task with ID: {}", task_id);
    let now = Utc::now();
    let result = sqlx::query(
        "UPDATE tasks SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL", // Only update if not already deleted
    )
    .bind(now)
    .bind(task_id)
    .execute(pool)
    .await
    .context(format!("Failed to soft delete task with ID: {}", task_id))?;

    let rows_affected = result.rows_affected();
    info!(
        "Soft deleted {} rows for task ID: {}",
        rows_affected, task_id
    );

    Ok(rows_affected > 0)
}

/// Marks a task completed and, for recurring tasks, stores its successor.
///
/// Both writes share one transaction. A successor that cannot be built or
/// stored is logged and skipped; the completion itself still commits.
///
/// The transaction takes the write lock before reading, so of two concurrent
/// completions of one task the second waits and then sees it completed.
#[allow(clippy::uninlined_format_args)]
pub async fn complete_task_in_db(pool: &SqlitePool, task_id: i64) -> Result<CompletionOutcome> {
    let mut tx = pool
        .begin_with("BEGIN IMMEDIATE")
        .await
        .context("Failed to begin completion transaction")?;

    let now = Utc::now();
    let completed = sqlx::query(
        "UPDATE tasks SET status = ?, completed_at = ? WHERE id = ? AND status = ? AND deleted_at IS NULL",
    )
    .bind(TaskStatus::Completed)
    .bind(now)
    .bind(task_id)
    .bind(TaskStatus::Todo)
    .execute(&mut *tx)
    .await
    .context(format!("Failed to complete task with ID: {}", task_id))?
    .rows_affected();

    let Some(task) = fetch_live_task(&mut tx, task_id).await? else {
        return Ok(CompletionOutcome::NotFound);
    };
    if completed == 0 {
        return Ok(CompletionOutcome::AlreadyCompleted);
    }

    let successor = if task.is_recurring {
        store_successor(&mut tx, &task, now).await
    } else {
        None
    };

    tx.commit()
        .await
        .context("Failed to commit completion transaction")?;

    info!("Task {} completed.", task_id);
    Ok(CompletionOutcome::Completed { task, successor })
}

async fn store_successor(
    conn: &mut SqliteConnection,
    completed: &Task,
    now: DateTime<Utc>,
) -> Option<Task> {
    let new_task = match build_successor_at(completed, now) {
        Ok(Some(new_task)) => new_task,
        Ok(None) => {
            info!("Recurring task {} has no further occurrences.", completed.id);
            return None;
        }
        Err(e) => {
            warn!(
                "Skipping successor of task {}: malformed recurrence rule: {}",
                completed.id, e
            );
            return None;
        }
    };

    match insert_task(conn, new_task).await {
        Ok(successor) => {
            info!(
                "Created task {} as the next occurrence of task {}, due {:?}.",
                successor.id, completed.id, successor.due_date
            );
            Some(successor)
        }
        Err(e) => {
            warn!(
                "Skipping successor of task {}: failed to store it: {:?}",
                completed.id, e
            );
            None
        }
    }
}

/// Returns the task followed by the tasks that generated it, newest first.
/// Soft-deleted ancestors are included since they are part of the history.
pub async fn get_task_chain_from_db(pool: &SqlitePool, task_id: i64) -> Result<Option<Vec<Task>>> {
    let mut conn = pool
        .acquire()
        .await
        .context("Failed to acquire a DB connection")?;

    let Some(task) = fetch_live_task(&mut conn, task_id).await? else {
        return Ok(None);
    };

    let mut visited = HashSet::from([task.id]);
    let mut cursor = task.parent_task_id;
    let mut chain = vec![task];

    while let Some(parent_id) = cursor {
        if !visited.insert(parent_id) {
            warn!("Task chain of {} revisits task {}; stopping.", task_id, parent_id);
            break;
        }
        let Some(parent) = fetch_any_task(&mut conn, parent_id).await? else {
            break;
        };
        cursor = parent.parent_task_id;
        chain.push(parent);
    }

    debug!("Task chain of {} has {} entries.", task_id, chain.len());
    Ok(Some(chain))
}

async fn fetch_live_task(conn: &mut SqliteConnection, task_id: i64) -> Result<Option<Task>> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ? AND deleted_at IS NULL")
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await
        .context(format!("Failed to fetch task with ID: {task_id}"))
}

async fn fetch_any_task(conn: &mut SqliteConnection, task_id: i64) -> Result<Option<Task>> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
        .bind(task_id)
        .fetch_optional(&mut *conn)
        .await
        .context(format!("Failed to fetch task with ID: {task_id}"))
}

async fn insert_task(conn: &mut SqliteConnection, new_task: NewTask) -> Result<Task> {
    let created_at = Utc::now();
    let recurrence = &new_task.recurrence;

    debug!(
        "Insert values: user_id={}, list_id={}, title={}, due_date={:?}, is_recurring={}, recurrence_type={:?}, parent_task_id={:?}",
        new_task.user_id,
        new_task.list_id,
        new_task.title,
        new_task.due_date,
        new_task.is_recurring,
        recurrence.recurrence_type,
        new_task.parent_task_id
    );

    let id = sqlx::query(
        r#"
        INSERT INTO tasks (
            user_id, list_id, title, description, priority, status,
            due_date, reminder_time, completed_at, is_recurring,
            recurrence_type, recurrence_interval, recurrence_weekdays,
            recurrence_month_day, recurrence_lunar_date, recurrence_end_date,
            parent_task_id, created_at, deleted_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(new_task.user_id)
    .bind(new_task.list_id)
    .bind(&new_task.title)
    .bind(&new_task.description)
    .bind(new_task.priority)
    .bind(new_task.status)
    .bind(new_task.due_date)
    .bind(new_task.reminder_time)
    .bind(new_task.is_recurring)
    .bind(&recurrence.recurrence_type)
    .bind(recurrence.recurrence_interval)
    .bind(&recurrence.recurrence_weekdays)
    .bind(recurrence.recurrence_month_day)
    .bind(&recurrence.recurrence_lunar_date)
    .bind(recurrence.recurrence_end_date)
    .bind(new_task.parent_task_id)
    .bind(created_at)
    .execute(&mut *conn)
    .await
    .context("Failed to insert task into DB")?
    .last_insert_rowid();

    Ok(Task {
        id,
        user_id: new_task.user_id,
        list_id: new_task.list_id,
        title: new_task.title,
        description: new_task.description,
        priority: new_task.priority,
        status: new_task.status,
        due_date: new_task.due_date,
        reminder_time: new_task.reminder_time,
        completed_at: None,
        is_recurring: new_task.is_recurring,
        recurrence: new_task.recurrence,
        parent_task_id: new_task.parent_task_id,
        created_at,
        deleted_at: None, // Newly created tasks are not deleted
    })
}
