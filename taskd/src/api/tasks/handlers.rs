//! API Handler implementations for task management.
//!
//! Repository calls block on a lock and on disk writes, so every handler
//! runs them on the blocking pool.

use axum::{
    body::Bytes,
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

use crate::api::tasks::types::{
    validate_title, CreateTaskRequest, ListTasksQuery, UpdateTaskRequest,
};
use crate::task::{Task, TaskError, TaskId, TaskRepository};

/// API errors for task operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Domain-level task error.
    #[error("Task error: {0}")]
    Task(#[from] TaskError),
    /// Path id was not a positive integer.
    #[error("Invalid task ID: {0}")]
    InvalidTaskId(String),
    /// Query string could not be interpreted.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    /// Body was not valid JSON or lacked a title.
    #[error("Invalid body: {0}")]
    InvalidBody(String),
    /// Title failed length validation.
    #[error("Invalid title: {0}")]
    InvalidTitle(String),
    /// Unexpected failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Task(e @ TaskError::NotFound(_)) => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Task(e @ (TaskError::EmptyTitle | TaskError::InvalidId(_))) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Task(e @ TaskError::SequenceExhausted(_)) => {
                tracing::error!(error = %e, "No task ids left");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::Task(TaskError::Persist(_) | TaskError::CorruptState(_)) => {
                tracing::error!(error = %self, "Task storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to persist task state".to_string(),
                )
            }
            ApiError::InvalidTaskId(_) => (StatusCode::BAD_REQUEST, "invalid id".to_string()),
            ApiError::InvalidQuery(msg) | ApiError::InvalidBody(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::InvalidTitle(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error while handling request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// GET /api/v1/tasks
///
/// List tasks, optionally filtered by `done` and paginated. A repeated
/// parameter uses its first value.
pub async fn list_tasks(
    State(repository): State<Arc<TaskRepository>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let filter = ListTasksQuery::from_pairs(pairs).parse()?;
    let tasks = blocking(move || Ok(repository.list())).await?;
    Ok(Json(filter.apply(tasks)))
}

/// GET /api/v1/tasks/{id}
pub async fn get_task(
    State(repository): State<Arc<TaskRepository>>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    let task = blocking(move || repository.get(id)).await?;
    Ok(Json(task))
}

/// POST /api/v1/tasks
pub async fn create_task(
    State(repository): State<Arc<TaskRepository>>,
    body: Bytes,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let req: CreateTaskRequest = decode_body(&body)?;
    if req.title.is_empty() {
        return Err(missing_title());
    }
    validate_title(&req.title)?;

    let task = blocking(move || repository.create(&req.title)).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /api/v1/tasks/{id}
///
/// Replace a task's title and completion flag.
pub async fn update_task(
    State(repository): State<Arc<TaskRepository>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Task>, ApiError> {
    let id = parse_id(&id)?;
    let req: UpdateTaskRequest = decode_body(&body)?;
    if req.title.is_empty() {
        return Err(missing_title());
    }
    validate_title(&req.title)?;

    let task = blocking(move || repository.update(id, &req.title, req.done)).await?;
    Ok(Json(task))
}

/// DELETE /api/v1/tasks/{id}
pub async fn delete_task(
    State(repository): State<Arc<TaskRepository>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    blocking(move || repository.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::InvalidTaskId(raw.to_string()))
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|_| missing_title())
}

fn missing_title() -> ApiError {
    ApiError::InvalidBody("invalid json: require non-empty title".to_string())
}

/// Run a repository call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, TaskError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("repository task failed: {e}")))?
        .map_err(ApiError::Task)
}
