//! REST API endpoints for task management.
//!
//! Handlers validate input, call the [`TaskRepository`](crate::task::TaskRepository)
//! and translate its errors into JSON `{"error": ...}` responses.

pub mod handlers;
pub mod routes;
pub mod types;

pub use handlers::ApiError;
pub use routes::routes;
pub use types::{CreateTaskRequest, ListFilter, ListTasksQuery, UpdateTaskRequest};
