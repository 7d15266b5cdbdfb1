//! # LWES Telemetry
//!
//! Logging setup and Prometheus counters for emitters and listeners.

pub mod logging;
pub mod metrics;

pub use logging::{Direction, EventLogger};
pub use metrics::MetricsRecorder;
