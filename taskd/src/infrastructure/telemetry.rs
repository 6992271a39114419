use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
    Resource,
};
use opentelemetry_semantic_conventions::resource;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

use crate::infrastructure::config::TelemetrySettings;

/// Builder for setting up telemetry (JSON logs and optional OTLP traces).
pub struct TelemetryBuilder {
    service_name: String,
    service_version: String,
    otlp_endpoint: Option<String>,
    log_level: String,
    sampling_ratio: f64,
}

/// Keeps the trace exporter alive; flushes pending spans on drop.
#[must_use = "dropping the guard shuts down trace export"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("failed to shut down tracer provider: {e}");
            }
        }
    }
}

impl TelemetryBuilder {
    /// Builder with info-level logs and no trace export.
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            otlp_endpoint: None,
            log_level: "info".to_string(),
            sampling_ratio: 1.0,
        }
    }

    /// Builder configured from settings.
    #[must_use]
    pub fn from_settings(settings: &TelemetrySettings, service_version: &str) -> Self {
        let builder = Self::new(settings.service_name.clone(), service_version)
            .with_log_level(settings.log_level.clone())
            .with_sampling_ratio(settings.sampling_ratio);
        match &settings.otlp_endpoint {
            Some(endpoint) => builder.with_tracing(endpoint.clone()),
            None => builder,
        }
    }

    #[must_use]
    pub fn with_tracing(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    #[must_use]
    pub fn with_sampling_ratio(mut self, ratio: f64) -> Self {
        self.sampling_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    /// Whether spans will be exported over OTLP.
    #[must_use]
    pub fn exports_traces(&self) -> bool {
        self.otlp_endpoint.is_some()
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The OTLP span exporter cannot be built
    /// - A global subscriber is already installed
    pub fn init(self) -> Result<TelemetryGuard> {
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let fmt_layer = fmt::layer().json().with_span_events(FmtSpan::CLOSE).boxed();

        let registry = Registry::default().with(env_filter).with(fmt_layer);

        let Some(endpoint) = self.otlp_endpoint.clone() else {
            registry.try_init().context("Failed to init subscriber")?;
            return Ok(TelemetryGuard { provider: None });
        };

        let provider = self.tracer_provider(endpoint)?;
        opentelemetry::global::set_tracer_provider(provider.clone());

        let tracer = provider.tracer(self.service_name.clone());
        let telemetry_layer = tracing_opentelemetry::layer().with_tracer(tracer);

        registry
            .with(telemetry_layer)
            .try_init()
            .context("Failed to init subscriber")?;

        Ok(TelemetryGuard {
            provider: Some(provider),
        })
    }

    fn tracer_provider(&self, endpoint: String) -> Result<SdkTracerProvider> {
        let resource = Resource::builder()
            .with_attributes(vec![
                opentelemetry::KeyValue::new(resource::SERVICE_NAME, self.service_name.clone()),
                opentelemetry::KeyValue::new(
                    resource::SERVICE_VERSION,
                    self.service_version.clone(),
                ),
            ])
            .build();

        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(endpoint)
            .build()
            .context("Failed to build OTLP span exporter")?;

        let processor = opentelemetry_sdk::trace::BatchSpanProcessor::builder(exporter).build();

        Ok(SdkTracerProvider::builder()
            .with_span_processor(processor)
            .with_resource(resource)
            .with_sampler(Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(
                self.sampling_ratio,
            ))))
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_without_endpoint_disable_trace_export() {
        let settings = TelemetrySettings {
            service_name: "taskd".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            sampling_ratio: 0.5,
        };
        let builder = TelemetryBuilder::from_settings(&settings, "0.1.0");
        assert!(!builder.exports_traces());
        assert_eq!(builder.log_level, "debug");
        assert!((builder.sampling_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn sampling_ratio_is_clamped() {
        let builder = TelemetryBuilder::new("taskd", "0.1.0")
            .with_sampling_ratio(4.0)
            .with_tracing("http://localhost:4317");
        assert!(builder.exports_traces());
        assert!((builder.sampling_ratio - 1.0).abs() < f64::EPSILON);
    }
}
