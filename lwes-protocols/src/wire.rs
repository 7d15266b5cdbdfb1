//! ## lwes-protocols::wire
//! Hard limits and type tags of the event datagram format.

use std::fmt;

use crate::error::DecodeError;

/// Largest datagram a UDP socket can carry: 64K minus the 20 byte IP header
/// and the 8 byte UDP header.
pub const MAX_MSG_SIZE: usize = 65535 - 28;

/// Longest event name or attribute key (one length byte).
pub const MAX_SHORT_STRING_SIZE: usize = u8::MAX as usize;

/// Longest string attribute value (two length bytes).
pub const MAX_LONG_STRING_SIZE: usize = u16::MAX as usize;

/// One-byte discriminator selecting an attribute's on-wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    U16 = 1,
    I16 = 2,
    U32 = 3,
    I32 = 4,
    String = 5,
    IpAddr = 6,
    I64 = 7,
    U64 = 8,
    Boolean = 9,
}

impl TypeTag {
    /// Payload width in bytes, or `None` for the length-prefixed string.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            TypeTag::U16 | TypeTag::I16 => Some(2),
            TypeTag::U32 | TypeTag::I32 | TypeTag::IpAddr => Some(4),
            TypeTag::I64 | TypeTag::U64 => Some(8),
            TypeTag::Boolean => Some(1),
            TypeTag::String => None,
        }
    }

    /// Type name as written in event specification files.
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::U16 => "uint16",
            TypeTag::I16 => "int16",
            TypeTag::U32 => "uint32",
            TypeTag::I32 => "int32",
            TypeTag::String => "string",
            TypeTag::IpAddr => "ip_addr",
            TypeTag::I64 => "int64",
            TypeTag::U64 => "uint64",
            TypeTag::Boolean => "boolean",
        }
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = DecodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            1 => TypeTag::U16,
            2 => TypeTag::I16,
            3 => TypeTag::U32,
            4 => TypeTag::I32,
            5 => TypeTag::String,
            6 => TypeTag::IpAddr,
            7 => TypeTag::I64,
            8 => TypeTag::U64,
            9 => TypeTag::Boolean,
            other => return Err(DecodeError::UnknownType(other)),
        })
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
