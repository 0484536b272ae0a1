//! `heatseek-runtime` – the reactive control loop.
//!
//! # Modules
//!
//! - [`control_loop`] – [`ControlLoop`][control_loop::ControlLoop]: reads a
//!   frame, classifies it, publishes the decision and drives the actuators
//!   once per tick, interleaving launch-sequence steps on the same task.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]:
//!   initialises the global `tracing` subscriber with an optional OTLP span
//!   exporter.  Set `OTEL_EXPORTER_OTLP_ENDPOINT` to enable live trace export
//!   to Jaeger, Grafana Tempo, or any OTLP-compatible collector.

pub mod control_loop;
pub mod telemetry;

pub use control_loop::{ControlLoop, LoopConfig, LoopStats, TickOutcome};
pub use telemetry::{LogFormat, TelemetrySettings, TracerProviderGuard, init_tracing};
