use std::io;

use thiserror::Error;

/// Transport errors. Construction failures are fatal to the caller; I/O
/// failures are reported per call and never retried.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid address {address:?}: {reason}")]
    InvalidAddress {
        address: String,
        reason: &'static str,
    },
    #[error("{0:?} is not a supported transport")]
    UnsupportedTransport(String),
    #[error("could not resolve {address:?}: {source}")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid multicast interface {0:?}")]
    InvalidInterface(String),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to join multicast group {group}: {source}")]
    Join {
        group: String,
        #[source]
        source: io::Error,
    },
    #[error("transport is closed")]
    Closed,
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// True for errors raised while building the endpoint rather than using it.
    pub fn is_construction(&self) -> bool {
        !matches!(self, TransportError::Closed | TransportError::Io(_))
    }
}
