//! ## lwes-protocols::codec
//! Serializes events to single datagrams and parses them back.
//!
//! ```text
//! Event := NameLen:u8 Name:bytes[NameLen] AttrCount:u16 Attr*
//! Attr  := KeyLen:u8 Key:bytes[KeyLen] Type:u8 Payload(Type)
//! ```
//!
//! All integers are big-endian. IPv4 payloads are the address octets in
//! reverse network order.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{DecodeError, EncodeError};
use crate::event::{Event, Value};
use crate::wire::{TypeTag, MAX_LONG_STRING_SIZE, MAX_MSG_SIZE, MAX_SHORT_STRING_SIZE};

/// Number of bytes `encode` would produce, without checking any limit.
pub fn encoded_len(event: &Event) -> usize {
    let attrs: usize = event
        .attributes
        .iter()
        .map(|(key, value)| {
            let payload = match value {
                Value::String(s) => 2 + s.len(),
                other => other.tag().fixed_width().unwrap_or(0),
            };
            1 + key.len() + 1 + payload
        })
        .sum();
    1 + event.name.len() + 2 + attrs
}

/// Encodes `event` into one datagram.
///
/// Fails without producing any bytes if the name or a key exceeds
/// [`MAX_SHORT_STRING_SIZE`] or the whole datagram would exceed [`MAX_MSG_SIZE`].
pub fn encode(event: &Event) -> Result<Bytes, EncodeError> {
    if event.name.len() > MAX_SHORT_STRING_SIZE {
        return Err(EncodeError::NameTooLong(event.name.len()));
    }
    let total = encoded_len(event);
    if total > MAX_MSG_SIZE {
        return Err(EncodeError::DatagramTooLarge);
    }
    let count =
        u16::try_from(event.attributes.len()).map_err(|_| EncodeError::DatagramTooLarge)?;

    let mut buf = BytesMut::with_capacity(total);
    put_short_string(&mut buf, &event.name);
    buf.put_u16(count);

    for (key, value) in &event.attributes {
        if key.len() > MAX_SHORT_STRING_SIZE {
            return Err(EncodeError::KeyTooLong {
                key: key.clone(),
                len: key.len(),
            });
        }
        put_short_string(&mut buf, key);
        buf.put_u8(value.tag() as u8);
        match value {
            Value::U16(v) => buf.put_u16(*v),
            Value::I16(v) => buf.put_i16(*v),
            Value::U32(v) => buf.put_u32(*v),
            Value::I32(v) => buf.put_i32(*v),
            Value::String(s) => {
                buf.put_u16(s.len() as u16);
                buf.put_slice(s.as_bytes());
            }
            Value::IpAddr(ip) => {
                let mut octets = ip.octets();
                octets.reverse();
                buf.put_slice(&octets);
            }
            Value::I64(v) => buf.put_i64(*v),
            Value::U64(v) => buf.put_u64(*v),
            Value::Boolean(b) => buf.put_u8(u8::from(*b)),
        }
    }

    debug_assert_eq!(buf.len(), total);
    Ok(buf.freeze())
}

// The datagram limit bounds every string value below its two-byte length field.
const _: () = assert!(MAX_MSG_SIZE < MAX_LONG_STRING_SIZE);

/// Caller guarantees `s.len() <= MAX_SHORT_STRING_SIZE`.
fn put_short_string(buf: &mut BytesMut, s: &str) {
    buf.put_u8(s.len() as u8);
    buf.put_slice(s.as_bytes());
}

/// Decodes one datagram. Never reads past the end of `datagram`; bytes after
/// the last declared attribute are ignored.
pub fn decode(datagram: &[u8]) -> Result<Event, DecodeError> {
    let mut reader = WireReader { buf: datagram };

    let name = reader.short_string("event name")?;
    let count = reader.u16("attribute count")?;
    let mut attributes = BTreeMap::new();

    for _ in 0..count {
        let key = reader.short_string("attribute key")?;
        let tag = TypeTag::try_from(reader.u8("type tag")?)?;
        let value = match tag {
            TypeTag::U16 => Value::U16(reader.u16("uint16")?),
            TypeTag::I16 => Value::I16(reader.i16("int16")?),
            TypeTag::U32 => Value::U32(reader.u32("uint32")?),
            TypeTag::I32 => Value::I32(reader.i32("int32")?),
            TypeTag::String => {
                let len = reader.u16("string length")?;
                Value::String(reader.string(len as usize, "string value")?)
            }
            TypeTag::IpAddr => {
                let o = reader.take(4, "ip_addr")?;
                Value::IpAddr(Ipv4Addr::new(o[3], o[2], o[1], o[0]))
            }
            TypeTag::I64 => Value::I64(reader.i64("int64")?),
            TypeTag::U64 => Value::U64(reader.u64("uint64")?),
            TypeTag::Boolean => Value::Boolean(reader.u8("boolean")? == 1),
        };
        attributes.insert(key, value);
    }

    Ok(Event { name, attributes })
}

/// Bounds-checked cursor over a received datagram.
struct WireReader<'a> {
    buf: &'a [u8],
}

impl<'a> WireReader<'a> {
    fn ensure(&self, needed: usize, field: &'static str) -> Result<(), DecodeError> {
        if self.buf.remaining() < needed {
            return Err(DecodeError::Truncated {
                field,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u8(&mut self, field: &'static str) -> Result<u8, DecodeError> {
        self.ensure(1, field)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self, field: &'static str) -> Result<u16, DecodeError> {
        self.ensure(2, field)?;
        Ok(self.buf.get_u16())
    }

    fn i16(&mut self, field: &'static str) -> Result<i16, DecodeError> {
        self.ensure(2, field)?;
        Ok(self.buf.get_i16())
    }

    fn u32(&mut self, field: &'static str) -> Result<u32, DecodeError> {
        self.ensure(4, field)?;
        Ok(self.buf.get_u32())
    }

    fn i32(&mut self, field: &'static str) -> Result<i32, DecodeError> {
        self.ensure(4, field)?;
        Ok(self.buf.get_i32())
    }

    fn u64(&mut self, field: &'static str) -> Result<u64, DecodeError> {
        self.ensure(8, field)?;
        Ok(self.buf.get_u64())
    }

    fn i64(&mut self, field: &'static str) -> Result<i64, DecodeError> {
        self.ensure(8, field)?;
        Ok(self.buf.get_i64())
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], DecodeError> {
        self.ensure(n, field)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn string(&mut self, n: usize, field: &'static str) -> Result<String, DecodeError> {
        let raw = self.take(n, field)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8 { field })
    }

    fn short_string(&mut self, field: &'static str) -> Result<String, DecodeError> {
        let len = self.u8(field)?;
        self.string(len as usize, field)
    }
}
