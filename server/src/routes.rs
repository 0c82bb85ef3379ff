// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use crate::handlers;
use axum::{
    Router,
    routing::{get, put},
};
use sqlx::SqlitePool;

/// Creates and configures the application router.
pub fn create_router(pool: SqlitePool) -> Router {
    Router::new()
        // `GET /api/tasks` lists tasks, `POST /api/tasks` creates one
        .route(
            "/api/tasks",
            get(handlers::list_tasks).post(handlers::create_task),
        )
        .route(
            "/api/tasks/{id}",
            get(handlers::get_task)
                .put(handlers::update_task)
                .delete(handlers::delete_task),
        )
        // Completing a recurring task also creates its next occurrence
        .route("/api/tasks/{id}/complete", put(handlers::complete_task))
        .route("/api/tasks/{id}/chain", get(handlers::task_chain))
        .route("/api/tasks/{id}/priority", put(handlers::update_task_priority))
        // Adds the database pool to the application state
        .with_state(pool)
}
