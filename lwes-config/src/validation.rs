// lwes-config/src/validation.rs
//! Custom validation functions for configuration.

use std::net::Ipv4Addr;

use regex::Regex;
use validator::ValidationError;

/// Validate `[scheme://]host:port` (udp family) or `unixgram://path`.
pub fn validate_address(address: &str) -> Result<(), ValidationError> {
    let re = Regex::new(r"^(?i:(udp[46]?://)?[^/]+:\d{1,5}|unixgram://.+)$")
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(address) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_address"))
    }
}

/// Validate a multicast interface: an IPv4 address or a numeric index.
pub fn validate_interface(interface: &str) -> Result<(), ValidationError> {
    if interface.parse::<Ipv4Addr>().is_ok() || interface.parse::<u32>().is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_interface"))
    }
}

/// Validate a log level accepted by the tracing filter.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"].contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
