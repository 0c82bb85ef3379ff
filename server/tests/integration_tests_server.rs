use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use common::{CompleteTaskResponse, Task, TaskStatus};
use http_body_util::BodyExt; // For `collect`
use serde_json::{Value, json};
use server::database::init_schema;
use server::routes::create_router;
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt; // For `oneshot`

/// Helper function to set up a fresh, in-memory database for each test.
/// One connection only, so every request sees the same in-memory database.
async fn setup_app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory SQLite");
    init_schema(&pool)
        .await
        .expect("Failed to create tasks table in test DB");
    create_router(pool)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes.to_vec())
}

async fn create(app: &Router, payload: Value) -> Task {
    let (status, body) = send(app, "POST", "/api/tasks", Some(payload)).await;
    assert_eq!(status, StatusCode::CREATED);
    serde_json::from_slice(&body).unwrap()
}

async fn complete(app: &Router, id: i64) -> CompleteTaskResponse {
    let (status, body) = send(app, "PUT", &format!("/api/tasks/{id}/complete"), None).await;
    assert_eq!(status, StatusCode::OK);
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_create_and_list_tasks() {
    let app = setup_app().await;

    let created = create(
        &app,
        json!({
            "user_id": 1,
            "list_id": 1,
            "title": "Test Task",
            "due_date": "2025-01-31T09:00:00Z"
        }),
    )
    .await;
    assert_eq!(created.title, "Test Task");
    assert_eq!(created.status, TaskStatus::Todo);

    let (status, body) = send(&app, "GET", "/api/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    let tasks: Vec<Task> = serde_json::from_slice(&body).unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, created.id);

    let (status, body) = send(&app, "GET", &format!("/api/tasks/{}", created.id), None).await;
    assert_eq!(status, StatusCode::OK);
    let fetched: Task = serde_json::from_slice(&body).unwrap();
    assert_eq!(fetched.due_date, created.due_date);
}

#[tokio::test]
async fn test_complete_daily_task_creates_successor() {
    let app = setup_app().await;
    let origin = create(
        &app,
        json!({
            "user_id": 1,
            "list_id": 4,
            "title": "Journal",
            "description": "Three lines",
            "priority": 1,
            "due_date": "2025-01-31T21:00:00Z",
            "reminder_time": "2025-01-31T20:30:00Z",
            "is_recurring": true,
            "recurrence_type": "daily"
        }),
    )
    .await;
    assert_eq!(origin.recurrence.recurrence_interval, 1);

    let response = complete(&app, origin.id).await;
    assert_eq!(response.task.status, TaskStatus::Completed);
    let successor = response.successor.expect("daily task should recur");
    assert_eq!(successor.parent_task_id, Some(origin.id));
    assert_eq!(successor.status, TaskStatus::Todo);
    assert_eq!(successor.list_id, 4);
    assert_eq!(successor.description, "Three lines");
    assert_eq!(
        successor.due_date.unwrap().to_rfc3339(),
        "2025-02-01T21:00:00+00:00"
    );
    assert_eq!(
        successor.reminder_time.unwrap().to_rfc3339(),
        "2025-02-01T20:30:00+00:00"
    );

    // Only the successor is still open.
    let (_, body) = send(&app, "GET", "/api/tasks", None).await;
    let open: Vec<Task> = serde_json::from_slice(&body).unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, successor.id);

    let (_, body) = send(&app, "GET", "/api/tasks?status=completed", None).await;
    let done: Vec<Task> = serde_json::from_slice(&body).unwrap();
    assert_eq!(done.len(), 1);
    assert_eq!(done[0].id, origin.id);
}

#[tokio::test]
async fn test_weekly_task_on_friday_moves_to_monday() {
    let app = setup_app().await;
    let origin = create(
        &app,
        json!({
            "user_id": 1,
            "list_id": 1,
            "title": "Gym",
            "due_date": "2025-01-10T07:00:00Z",
            "is_recurring": true,
            "recurrence_type": "weekly",
            "recurrence_weekdays": "[1,3,5]"
        }),
    )
    .await;

    let successor = complete(&app, origin.id).await.successor.unwrap();
    assert_eq!(
        successor.due_date.unwrap().to_rfc3339(),
        "2025-01-13T07:00:00+00:00"
    );
    assert_eq!(
        successor.recurrence.recurrence_weekdays.as_deref(),
        Some("[1,3,5]")
    );
}

#[tokio::test]
async fn test_yearly_task_past_end_date_has_no_successor() {
    let app = setup_app().await;
    let origin = create(
        &app,
        json!({
            "user_id": 1,
            "list_id": 1,
            "title": "Renew passport",
            "due_date": "2025-06-01T00:00:00Z",
            "is_recurring": true,
            "recurrence_type": "yearly",
            "recurrence_interval": 1,
            "recurrence_end_date": "2025-12-31T00:00:00Z"
        }),
    )
    .await;

    let response = complete(&app, origin.id).await;
    assert_eq!(response.task.status, TaskStatus::Completed);
    assert!(response.successor.is_none());

    let (_, body) = send(&app, "GET", "/api/tasks", None).await;
    let open: Vec<Task> = serde_json::from_slice(&body).unwrap();
    assert!(open.is_empty());
}

#[tokio::test]
async fn test_complete_twice_conflicts() {
    let app = setup_app().await;
    let origin = create(
        &app,
        json!({
            "user_id": 1,
            "list_id": 1,
            "title": "Stretch",
            "is_recurring": true,
            "recurrence_type": "daily"
        }),
    )
    .await;

    complete(&app, origin.id).await;
    let uri = format!("/api/tasks/{}/complete", origin.id);
    let (status, body) = send(&app, "PUT", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        error["error"],
        format!("Task with ID {} is already completed.", origin.id)
    );

    let (status, _) = send(&app, "PUT", "/api/tasks/999/complete", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chain_lists_predecessors() {
    let app = setup_app().await;
    let origin = create(
        &app,
        json!({
            "user_id": 1,
            "list_id": 1,
            "title": "Water plants",
            "due_date": "2025-03-03T08:00:00Z",
            "is_recurring": true,
            "recurrence_type": "workday"
        }),
    )
    .await;

    let first = complete(&app, origin.id).await.successor.unwrap();
    let second = complete(&app, first.id).await.successor.unwrap();

    let uri = format!("/api/tasks/{}/chain", second.id);
    let (status, body) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let chain: Vec<Task> = serde_json::from_slice(&body).unwrap();
    let ids: Vec<i64> = chain.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![second.id, first.id, origin.id]);
}

#[tokio::test]
async fn test_update_and_delete_task() {
    let app = setup_app().await;
    let task = create(
        &app,
        json!({ "user_id": 1, "list_id": 1, "title": "Draft" }),
    )
    .await;

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/api/tasks/{}", task.id),
        Some(json!({
            "title": "Final",
            "is_recurring": true,
            "recurrence_type": "monthly",
            "recurrence_month_day": 31
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let updated: Task = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.recurrence.recurrence_interval, 1);
    assert_eq!(updated.recurrence.recurrence_month_day, Some(31));

    let (status, _) = send(&app, "DELETE", &format!("/api/tasks/{}", task.id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/tasks/{}", task.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &format!("/api/tasks/{}", task.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_task_validation_errors() {
    let app = setup_app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(json!({ "user_id": 1, "list_id": 1, "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(error["error"], "Task title cannot be empty.");

    let (status, body) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(json!({
            "user_id": 1,
            "list_id": 1,
            "title": "Late reminder",
            "due_date": "2025-01-01T09:00:00Z",
            "reminder_time": "2025-01-01T10:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(
        error["error"],
        "Reminder time cannot be later than the due date."
    );
}

#[tokio::test]
async fn test_list_filters_by_list_and_due_window() {
    let app = setup_app().await;
    let soon = chrono::Utc::now() + chrono::Duration::days(2);
    let later = chrono::Utc::now() + chrono::Duration::days(30);

    let errand = create(
        &app,
        json!({ "user_id": 1, "list_id": 1, "title": "Errand", "due_date": soon }),
    )
    .await;
    let report = create(
        &app,
        json!({ "user_id": 1, "list_id": 2, "title": "Report", "due_date": soon }),
    )
    .await;
    create(
        &app,
        json!({ "user_id": 1, "list_id": 2, "title": "Roadmap", "due_date": later }),
    )
    .await;

    let (status, body) = send(&app, "GET", "/api/tasks?list_id=2&type=week", None).await;
    assert_eq!(status, StatusCode::OK);
    let tasks: Vec<Task> = serde_json::from_slice(&body).unwrap();
    let ids: Vec<i64> = tasks.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![report.id]);

    let (_, body) = send(&app, "GET", "/api/tasks?type=week", None).await;
    let tasks: Vec<Task> = serde_json::from_slice(&body).unwrap();
    let ids: Vec<i64> = tasks.iter().map(|task| task.id).collect();
    assert_eq!(ids, vec![errand.id, report.id]);

    let (status, _) = send(&app, "GET", "/api/tasks?type=fortnight", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_priority() {
    let app = setup_app().await;
    let task = create(
        &app,
        json!({ "user_id": 1, "list_id": 1, "title": "Taxes", "priority": 2 }),
    )
    .await;

    let uri = format!("/api/tasks/{}/priority", task.id);
    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "priority": 0 }))).await;
    assert_eq!(status, StatusCode::OK);
    let updated: Task = serde_json::from_slice(&body).unwrap();
    assert_eq!(updated.priority, 0);
    assert_eq!(updated.title, "Taxes");

    let missing = Some(json!({ "priority": 1 }));
    let (status, _) = send(&app, "PUT", "/api/tasks/999/priority", missing).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
