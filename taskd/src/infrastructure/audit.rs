use serde::Serialize;
use tracing::{info, info_span};

/// Lifecycle event for audit logging.
/// Structured for JSON serialization to enable machine-readable audit trails.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    ServiceStartup {
        service: String,
        version: String,
    },
    StateLoaded {
        path: Option<String>,
        tasks: usize,
        sequence: u64,
    },
    StateLoadFailed {
        path: String,
        error: String,
    },
    ServiceShutdown {
        reason: String,
    },
}

/// Logs an audit event to the dedicated audit channel as structured JSON.
/// This uses a specific `target` which can be filtered by the subscriber to redirect to a separate sink.
pub fn log_audit(event: &AuditEvent) {
    let span = info_span!(target: "audit", "audit_event");
    let _enter = span.enter();

    let json = serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
    info!(target: "audit", audit_json = %json, "Audit Event");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_audit_variants() {
        // These calls should not panic
        log_audit(&AuditEvent::ServiceStartup {
            service: "taskd".into(),
            version: "0.1.0".into(),
        });
        log_audit(&AuditEvent::StateLoaded {
            path: Some("tasks.json".into()),
            tasks: 3,
            sequence: 7,
        });
        log_audit(&AuditEvent::StateLoadFailed {
            path: "tasks.json".into(),
            error: "malformed snapshot".into(),
        });
        log_audit(&AuditEvent::ServiceShutdown {
            reason: "Testing".into(),
        });
    }

    #[test]
    fn test_audit_event_is_tagged() {
        let json = serde_json::to_string(&AuditEvent::StateLoaded {
            path: None,
            tasks: 0,
            sequence: 0,
        })
        .unwrap();
        assert!(json.contains("\"event_type\":\"state_loaded\""));
    }
}
