//! Observability setup for Nexus: structured logging via `tracing`, with an
//! optional OpenTelemetry span exporter.

pub mod tracing_setup;
