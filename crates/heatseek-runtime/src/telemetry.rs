//! Tracing pipeline initialisation for HeatSeek.
//!
//! Call [`init_tracing`] once at process startup to wire up the `tracing`
//! subscriber with an optional OTLP span exporter.
//!
//! # Environment variables
//!
//! | Variable | Effect |
//! |---|---|
//! | `OTEL_EXPORTER_OTLP_ENDPOINT` | OTLP collector URL; enables export. |
//! | `RUST_LOG` | Log filter (default `"info"`). |
//! | `HEATSEEK_LOG_FORMAT=json` | Emit newline-delimited JSON logs. |
//!
//! # Example
//!
//! ```rust,no_run
//! // Hold the guard for the entire lifetime of the process.
//! let _guard = heatseek_runtime::telemetry::init_tracing("heatseek");
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Console log encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Interpret a `HEATSEEK_LOG_FORMAT` value; anything but `json`
    /// (case-insensitive) is compact.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Compact,
        }
    }
}

/// Everything [`init_tracing`] reads from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetrySettings {
    pub service_name: String,
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset.
    pub default_filter: String,
    pub otlp_endpoint: Option<String>,
}

impl TelemetrySettings {
    pub fn from_env(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            format: LogFormat::parse(std::env::var("HEATSEEK_LOG_FORMAT").ok().as_deref()),
            default_filter: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
                .ok()
                .filter(|e| !e.trim().is_empty()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// Initialise the global `tracing` subscriber from the environment.
///
/// The returned [`TracerProviderGuard`] **must** be held for the lifetime of
/// the process; dropping it flushes all pending span batches.
pub fn init_tracing(service_name: &str) -> TracerProviderGuard {
    init_with(TelemetrySettings::from_env(service_name))
}

/// Initialise the global `tracing` subscriber from explicit settings.
///
/// If a global subscriber is already installed the call leaves it in place
/// and reports the conflict on stderr.
pub fn init_with(settings: TelemetrySettings) -> TracerProviderGuard {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.default_filter));

    let provider = settings
        .otlp_endpoint
        .as_deref()
        .and_then(|endpoint| build_provider(&settings.service_name, endpoint));
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("heatseek")));

    let registry = tracing_subscriber::registry().with(env_filter).with(otel_layer);
    let result = match settings.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init(),
        LogFormat::Compact => registry
            .with(tracing_subscriber::fmt::layer().compact().with_target(true))
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("[heatseek] tracing already initialised: {e}");
    }

    TracerProviderGuard(provider)
}

// ─────────────────────────────────────────────────────────────────────────────
// RAII guard
// ─────────────────────────────────────────────────────────────────────────────

/// RAII guard that shuts down the OTel [`SdkTracerProvider`] on drop.
pub struct TracerProviderGuard(Option<SdkTracerProvider>);

impl TracerProviderGuard {
    /// Whether spans are being exported to a collector.
    pub fn is_exporting(&self) -> bool {
        self.0.is_some()
    }
}

impl Drop for TracerProviderGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.0.take() {
            if let Err(e) = provider.shutdown() {
                eprintln!("[heatseek] OpenTelemetry provider shutdown error: {e}");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Returns `None` when the exporter cannot be initialised (the error is
/// printed to stderr and the caller falls back to console output only).
fn build_provider(service_name: &str, endpoint: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[heatseek] OTLP exporter init failed: {e}"))
        .ok()?;

    let resource = Resource::builder()
        .with_service_name(service_name.to_string())
        .build();

    Some(
        SdkTracerProvider::builder()
            .with_resource(resource)
            // Simple exporter: the CLI calls this before its Tokio runtime exists.
            .with_simple_exporter(exporter)
            .build(),
    )
}
