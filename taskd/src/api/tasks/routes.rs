//! REST API routes for task management.

use axum::{routing::get, Router};
use std::sync::Arc;

use crate::api::tasks::handlers::{create_task, delete_task, get_task, list_tasks, update_task};
use crate::task::TaskRepository;

/// API routes for task management, mounted at `/api/v1`.
pub fn routes() -> Router<Arc<TaskRepository>> {
    Router::new()
        .route("/api/v1/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/v1/tasks/{id}",
            get(get_task).put(update_task).delete(delete_task),
        )
}
