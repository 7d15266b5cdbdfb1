//! Codec error types.

use thiserror::Error;

use crate::wire::{MAX_MSG_SIZE, MAX_SHORT_STRING_SIZE};

/// Errors that can occur while serializing an event. Nothing is written on failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("event name is {0} bytes, exceeds MAX_SHORT_STRING_SIZE ({MAX_SHORT_STRING_SIZE})")]
    NameTooLong(usize),
    #[error("attribute key {key:?} is {len} bytes, exceeds MAX_SHORT_STRING_SIZE ({MAX_SHORT_STRING_SIZE})")]
    KeyTooLong { key: String, len: usize },
    #[error("encoded event exceeds MAX_MSG_SIZE ({MAX_MSG_SIZE})")]
    DatagramTooLarge,
}

/// Errors that can occur while parsing a received datagram.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("datagram truncated: {field} needs {needed} bytes, {remaining} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("unknown attribute type tag {0}")]
    UnknownType(u8),
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
}

/// Errors that can occur while mapping JSON onto an event.
#[derive(Debug, Error)]
pub enum JsonError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("attribute {key:?} has unsupported JSON value {value}")]
    UnsupportedValue {
        key: String,
        value: serde_json::Value,
    },
    #[error("JSON syntax error: {0}")]
    Syntax(#[from] serde_json::Error),
}
