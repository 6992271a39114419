//! Configuration management for taskd.
//!
//! Settings are layered: built-in defaults, then an optional `taskd.toml`
//! in the working directory, then `TASKD__*` environment variables
//! (for example `TASKD__STORAGE__PATH=/var/lib/taskd/tasks.json`).
//!
//! # Example
//!
//! ```no_run
//! use taskd::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! ```

pub mod server;
pub mod storage;
pub mod telemetry;

pub use server::ServerSettings;
pub use storage::StorageSettings;
pub use telemetry::TelemetrySettings;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

/// Top-level configuration for taskd.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Server settings.
    pub server: ServerSettings,
    /// Snapshot storage settings.
    pub storage: StorageSettings,
    /// Telemetry settings.
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Creates a new settings instance from defaults, `taskd.toml`, and
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::with_name("taskd").required(false))
            .add_source(Environment::with_prefix("TASKD").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Builder pre-populated with default values and no other sources.
    ///
    /// # Errors
    ///
    /// Returns an error if a default cannot be set.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("storage.path", "tasks.json")?
            .set_default("storage.durability", "best_effort")?
            .set_default("telemetry.service_name", "taskd")?
            .set_default("telemetry.log_level", "info")?
            .set_default("telemetry.sampling_ratio", 1.0)
    }
}

/// Helper for strong typing addresses
pub struct BindAddress(pub String, pub u16);

impl BindAddress {
    /// Converts the bind address to a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the IP address string cannot be parsed.
    pub fn to_socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let ip = self
            .0
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid IP address '{}': {e}", self.0))?;
        Ok(std::net::SocketAddr::new(ip, self.1))
    }
}
