//! Logging and span export setup
//!
//! ## Usage
//!
//! ```ignore
//! // Without telemetry feature: env_logger (RUST_LOG)
//! let guard = telemetry::init(&config);
//!
//! // With telemetry feature: tracing console output, plus OTLP span export to
//! // config.otlp_endpoint (APM_OTLP_ENDPOINT) sampled at config.sample_ratio
//! let guard = telemetry::init(&config);
//!
//! // On exit
//! guard.shutdown();
//! ```

use crate::config::ApmConfig;

#[cfg(feature = "telemetry")]
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Keeps the span exporter alive until shut down
#[derive(Debug, Default)]
pub struct TelemetryGuard {
    #[cfg(feature = "telemetry")]
    tracer_provider: Option<opentelemetry_sdk::trace::SdkTracerProvider>,
}

impl TelemetryGuard {
    /// Flush pending spans and stop the exporter
    pub fn shutdown(self) {
        #[cfg(feature = "telemetry")]
        if let Some(provider) = self.tracer_provider {
            if let Err(e) = provider.shutdown() {
                eprintln!("Failed to shut down tracer provider: {}", e);
            }
        }
    }
}

/// Initialize logging/tracing
///
/// **Without `telemetry` feature:**
/// - Uses `env_logger` (RUST_LOG env var)
///
/// **With `telemetry` feature:**
/// - OpenTelemetry export to `otlp_endpoint` when set
/// - Falls back to tracing_subscriber console output
pub fn init(config: &ApmConfig) -> TelemetryGuard {
    #[cfg(not(feature = "telemetry"))]
    {
        let _ = config;
        if let Err(e) = env_logger::try_init() {
            eprintln!("Logger already initialized: {}", e);
        }
        return TelemetryGuard::default();
    }

    #[cfg(feature = "telemetry")]
    {
        if config.otlp_endpoint.is_empty() {
            init_console();
            return TelemetryGuard::default();
        }

        match init_otel(config) {
            Ok(guard) => guard,
            Err(e) => {
                eprintln!(
                    "Failed to init OpenTelemetry: {}, falling back to console",
                    e
                );
                init_console();
                TelemetryGuard::default()
            }
        }
    }
}

#[cfg(feature = "telemetry")]
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Console-only tracing (no OTLP)
#[cfg(feature = "telemetry")]
fn init_console() {
    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// OpenTelemetry tracing with OTLP export
#[cfg(feature = "telemetry")]
fn init_otel(config: &ApmConfig) -> Result<TelemetryGuard, Box<dyn std::error::Error>> {
    use opentelemetry::KeyValue;
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::Resource;
    use opentelemetry_sdk::trace::{Sampler, SdkTracerProvider};

    // Unique instance ID (first 8 chars of UUID v4)
    let instance_id = uuid::Uuid::new_v4().to_string()[..8].to_string();

    let resource = Resource::builder()
        .with_attribute(KeyValue::new("service.name", config.service_name.clone()))
        .with_attribute(KeyValue::new(
            "deployment.environment",
            config.environment.clone(),
        ))
        .with_attribute(KeyValue::new("service.instance.id", instance_id.clone()))
        .build();

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&config.otlp_endpoint)
        .build()?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::TraceIdRatioBased(config.sample_ratio))
        .with_batch_exporter(span_exporter)
        .build();

    let tracer = tracer_provider.tracer("tailfirst-apm");

    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        instance_id = %instance_id,
        endpoint = %config.otlp_endpoint,
        sample_ratio = config.sample_ratio,
        "OpenTelemetry initialized"
    );

    Ok(TelemetryGuard {
        tracer_provider: Some(tracer_provider),
    })
}
