//! taskd - a small task tracking service.
//!
//! This crate provides the in-memory task repository with snapshot
//! persistence, the REST API on top of it, and the infrastructure
//! (configuration, telemetry, HTTP server) that wires them together.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// REST API handlers and routes.
pub mod api;
/// Infrastructure components (config, server, telemetry).
pub mod infrastructure;
/// Task domain types and repository.
pub mod task;
