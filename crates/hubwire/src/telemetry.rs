//! Logging and trace export for applications built on hubwire.

use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Configuration for the telemetry subsystem.
#[derive(Debug)]
pub struct TelemetryConfig {
    service_name: String,
    otlp_endpoint: Option<String>,
    log_level: String,
    ansi: bool,
}

impl TelemetryConfig {
    /// Creates a new configuration builder with default settings.
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.otlp_endpoint.as_deref()
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn ansi(&self) -> bool {
        self.ansi
    }

    /// Installs the global subscriber: an env filter, a fmt layer and, when an
    /// endpoint is set, an OTLP span exporter over gRPC.
    ///
    /// Exporting spans needs a running Tokio runtime.
    pub fn init(self) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
        let filter = tracing_subscriber::EnvFilter::try_new(&self.log_level)?;
        let fmt = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(self.ansi);

        let otlp = match self.otlp_endpoint {
            Some(endpoint) => {
                opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

                let exporter = opentelemetry_otlp::new_exporter()
                    .tonic()
                    .with_endpoint(endpoint);

                let tracer = opentelemetry_otlp::new_pipeline()
                    .tracing()
                    .with_exporter(exporter)
                    .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
                        opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                            "service.name",
                            self.service_name,
                        )]),
                    ))
                    .install_batch(opentelemetry_sdk::runtime::Tokio)?;

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            }
            None => None,
        };

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt)
            .with(otlp)
            .try_init()?;

        Ok(())
    }
}

/// Builder for `TelemetryConfig`.
#[derive(Default)]
pub struct TelemetryConfigBuilder {
    service_name: Option<String>,
    otlp_endpoint: Option<String>,
    log_level: Option<String>,
    ansi: Option<bool>,
}

impl TelemetryConfigBuilder {
    /// Sets the service name reported with exported spans.
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Sets the OTLP endpoint URL. Without one, spans are not exported.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    /// Sets the log filter directive (default: "info").
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    /// Colored console output (default: true).
    pub fn ansi(mut self, ansi: bool) -> Self {
        self.ansi = Some(ansi);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self
                .service_name
                .unwrap_or_else(|| "hubwire-unknown".to_string()),
            otlp_endpoint: self.otlp_endpoint,
            log_level: self.log_level.unwrap_or_else(|| "info".to_string()),
            ansi: self.ansi.unwrap_or(true),
        }
    }
}

/// Shuts down the telemetry subsystem, flushing pending spans.
pub fn shutdown_tracing() {
    opentelemetry::global::shutdown_tracer_provider();
}
