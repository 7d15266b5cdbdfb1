//! ## lwes-telemetry::logging
//! Subscriber installation and per-event log records.

use std::error::Error;

use lwes_config::TelemetryConfig;
use lwes_protocols::Event;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

/// Direction an event travelled, recorded on each log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Sent => "sent",
            Direction::Received => "received",
        }
    }
}

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. `RUST_LOG` wins over the configured level.
    pub fn init(config: &TelemetryConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.log_level))?;
        let builder = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_thread_names(true);

        if config.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        }
    }

    #[inline]
    pub fn log_event(direction: Direction, event: &Event) {
        debug!(
            direction = direction.as_str(),
            name = %event.name,
            attributes = event.len(),
            "lwes event"
        );
    }
}
