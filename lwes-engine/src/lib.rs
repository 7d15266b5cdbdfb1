//! # LWES Engine
//!
//! Emitters and listeners built on the codec and transport crates.

pub mod emitter;
pub mod error;
pub mod listener;
pub mod shutdown;

pub use emitter::{Emitter, INTERRUPT_EXIT_CODE};
pub use error::EngineError;
pub use listener::{Listener, RECEIPT_TIME, SENDER_IP, SENDER_PORT};
pub use shutdown::{wait_for_interrupt, ShutdownReason, ShutdownSignal};
