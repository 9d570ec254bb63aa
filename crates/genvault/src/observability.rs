//! Logging initialization.

use derive_getters::Getters;
use genvault_error::{ConfigError, GenvaultError, GenvaultResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

/// Settings of the `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "genvault_hybrid=debug")
    #[serde(default = "default_level")]
    level: String,
    /// Enable JSON-formatted logs for structured logging
    #[serde(default)]
    json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Set the log level.
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Enable JSON-formatted logs.
    pub fn with_json(mut self, enabled: bool) -> Self {
        self.json = enabled;
        self
    }
}

fn env_filter(config: &LoggingConfig) -> GenvaultResult<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| {
            GenvaultError::from(ConfigError::new(format!(
                "Invalid log level '{}': {}",
                config.level, e
            )))
        })
}

fn fmt_layer<S>(config: &LoggingConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    if config.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_level(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .boxed()
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Returns a `ConfigError` for an unparsable level or if a global
/// subscriber is already installed.
#[cfg(not(feature = "observability"))]
pub fn init_logging(config: &LoggingConfig) -> GenvaultResult<()> {
    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(fmt_layer(config))
        .try_init()
        .map_err(|e| GenvaultError::from(ConfigError::new(format!("Logging init failed: {}", e))))
}

/// Install the global tracing subscriber with an OpenTelemetry bridge.
///
/// This sets up:
/// - The configured fmt layer (text or JSON)
/// - Tracing with OpenTelemetry bridge
/// - Stdout span exporter for development
///
/// `RUST_LOG` takes precedence over the configured level.
///
/// # Errors
///
/// Returns a `ConfigError` for an unparsable level or if a global
/// subscriber is already installed.
#[cfg(feature = "observability")]
pub fn init_logging(config: &LoggingConfig) -> GenvaultResult<()> {
    use opentelemetry::{KeyValue, global, trace::TracerProvider};
    use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
    use opentelemetry_stdout::SpanExporter;

    let resource = Resource::builder()
        .with_service_name(env!("CARGO_PKG_NAME"))
        .with_attributes(vec![KeyValue::new(
            "service.version",
            env!("CARGO_PKG_VERSION"),
        )])
        .build();

    let provider = SdkTracerProvider::builder()
        .with_simple_exporter(SpanExporter::default())
        .with_resource(resource)
        .build();
    global::set_tracer_provider(provider.clone());

    let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(env_filter(config)?)
        .with(fmt_layer(config))
        .with(otel_layer)
        .try_init()
        .map_err(|e| GenvaultError::from(ConfigError::new(format!("Logging init failed: {}", e))))
}
