//! Listener configuration.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::emitter::default_address;
use crate::validation;

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
pub struct ListenerConfig {
    /// Address to bind, or multicast group to join.
    #[validate(custom(function = validation::validate_address))]
    #[serde(default = "default_address")]
    pub address: String,

    /// Interface address or index the group is joined on.
    #[validate(custom(function = validation::validate_interface))]
    #[serde(default)]
    pub interface: Option<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            interface: None,
        }
    }
}
