//! # LWES Protocol
//!
//! Data model and wire codec for light-weight event datagrams: named, typed
//! key/value records that each fit in a single UDP datagram.

pub mod codec;
pub mod control;
pub mod error;
pub mod event;
pub mod json;
pub mod wire;

pub use codec::{decode, encode, encoded_len};
pub use control::ControlKind;
pub use error::{DecodeError, EncodeError, JsonError};
pub use event::{Event, Value};
pub use wire::{TypeTag, MAX_MSG_SIZE, MAX_SHORT_STRING_SIZE};
