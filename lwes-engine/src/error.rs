use lwes_protocols::{DecodeError, EncodeError};
use lwes_transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("event could not be encoded: {0}")]
    Encode(#[from] EncodeError),

    #[error("datagram could not be decoded: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("emitter is already closed")]
    Closed,
}

impl EngineError {
    /// True when the endpoint could not be built at all.
    pub fn is_construction(&self) -> bool {
        matches!(self, EngineError::Transport(e) if e.is_construction())
    }

    /// True when the underlying transport has been closed.
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            EngineError::Closed | EngineError::Transport(TransportError::Closed)
        )
    }
}
