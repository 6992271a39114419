//! REST API for taskd.
//!
//! This module provides the HTTP endpoints for creating, listing, updating,
//! and deleting tasks.

pub mod tasks;

pub use tasks::routes as task_routes;
pub use tasks::ApiError;
