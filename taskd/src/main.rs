//! taskd server binary.

use anyhow::Context;
use std::sync::Arc;
use taskd::infrastructure::{
    audit, config::Settings, server, telemetry::TelemetryBuilder,
};
use tokio::signal;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new().context("Failed to load configuration")?;

    let _telemetry = TelemetryBuilder::from_settings(&config.telemetry, VERSION)
        .init()
        .context("Failed to initialize telemetry")?;

    info!("taskd starting...");
    audit::log_audit(&audit::AuditEvent::ServiceStartup {
        service: config.telemetry.service_name.clone(),
        version: VERSION.into(),
    });

    let snapshot_path = config
        .storage
        .snapshot_path()
        .map(|p| p.display().to_string());

    // Returning instead of exiting lets the telemetry guard flush on drop.
    let repository = match config.storage.open_repository() {
        Ok(repository) => repository,
        Err(e) => {
            error!("Failed to load task state: {}", e);
            audit::log_audit(&audit::AuditEvent::StateLoadFailed {
                path: snapshot_path.unwrap_or_default(),
                error: e.to_string(),
            });
            return Err(anyhow::Error::new(e).context("Failed to load task state"));
        }
    };

    audit::log_audit(&audit::AuditEvent::StateLoaded {
        path: snapshot_path,
        tasks: repository.len(),
        sequence: repository.sequence(),
    });

    let repository = Arc::new(repository);

    if let Err(e) = server::run_server(&config, repository, shutdown_signal()).await {
        error!("HTTP server failed: {:?}", e);
        return Err(e);
    }

    info!("Shutdown signal received, cleaning up...");
    audit::log_audit(&audit::AuditEvent::ServiceShutdown {
        reason: "Signal received".into(),
    });

    info!("taskd shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
