//! Emitter configuration.
//!
//! Destination, liveness cadence and interrupt handling for a sending endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct EmitterConfig {
    /// Destination, `[scheme://]host:port` or `unixgram://path`.
    #[validate(custom(function = validation::validate_address))]
    #[serde(default = "default_address")]
    pub address: String,

    /// Seconds between heartbeat events; 0 disables them.
    #[validate(range(max = 3600))]
    #[serde(default = "default_heartbeat")]
    pub heartbeat_secs: u64,

    /// Multicast hop limit.
    #[validate(range(max = 255))]
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Interface address or index for multicast.
    #[validate(custom(function = validation::validate_interface))]
    #[serde(default)]
    pub interface: Option<String>,

    /// Watch for SIGINT/SIGTERM and send a final shutdown event.
    #[serde(default = "default_true")]
    pub handle_interrupt: bool,

    /// Exit the process after the interrupt's shutdown event.
    #[serde(default = "default_true")]
    pub exit_on_interrupt: bool,
}

pub(crate) fn default_address() -> String {
    "224.2.2.22:12345".into()
}

fn default_heartbeat() -> u64 {
    1
}

fn default_ttl() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl EmitterConfig {
    /// Heartbeat period, `None` when periodic emission is disabled.
    pub fn heartbeat(&self) -> Option<Duration> {
        (self.heartbeat_secs > 0).then(|| Duration::from_secs(self.heartbeat_secs))
    }
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            heartbeat_secs: default_heartbeat(),
            ttl: default_ttl(),
            interface: None,
            handle_interrupt: default_true(),
            exit_on_interrupt: default_true(),
        }
    }
}
