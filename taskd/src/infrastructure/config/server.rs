//! Server configuration for taskd.
//!
//! This module defines HTTP server binding settings.

use serde::Deserialize;

use super::BindAddress;

/// Server binding settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
}

impl ServerSettings {
    /// Address the HTTP listener binds to.
    #[must_use]
    pub fn bind_address(&self) -> BindAddress {
        BindAddress(self.host.clone(), self.port)
    }
}
