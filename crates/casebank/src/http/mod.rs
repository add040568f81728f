//! HTTP telemetry surface
//!
//! Read-only JSON endpoints polled by the monitoring dashboard.

pub mod api;

pub use api::{router, ApiState, ProcessTelemetry};
