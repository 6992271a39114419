/// Audit logging for lifecycle events.
pub mod audit;
/// Configuration management.
pub mod config;
/// HTTP server and middleware.
pub mod server;
/// Telemetry setup for logging and tracing.
pub mod telemetry;
