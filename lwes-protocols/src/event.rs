//! ## lwes-protocols::event
//! Named, typed key/value records carried one per datagram.

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use crate::wire::TypeTag;

/// An attribute value. Exactly the kinds the wire format can represent;
/// narrower integers widen through the `From` impls below.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    String(String),
    IpAddr(Ipv4Addr),
    I64(i64),
    U64(u64),
    Boolean(bool),
}

impl Value {
    /// The wire tag this value is encoded with.
    pub fn tag(&self) -> TypeTag {
        match self {
            Value::U16(_) => TypeTag::U16,
            Value::I16(_) => TypeTag::I16,
            Value::U32(_) => TypeTag::U32,
            Value::I32(_) => TypeTag::I32,
            Value::String(_) => TypeTag::String,
            Value::IpAddr(_) => TypeTag::IpAddr,
            Value::I64(_) => TypeTag::I64,
            Value::U64(_) => TypeTag::U64,
            Value::Boolean(_) => TypeTag::Boolean,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_ip(&self) -> Option<Ipv4Addr> {
        match self {
            Value::IpAddr(ip) => Some(*ip),
            _ => None,
        }
    }

    /// Signed view of any integer value that fits in an `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::U16(v) => Some(v.into()),
            Value::I16(v) => Some(v.into()),
            Value::U32(v) => Some(v.into()),
            Value::I32(v) => Some(v.into()),
            Value::I64(v) => Some(v),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident as $wide:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(<$wide>::from(v))
                }
            }
        )*
    };
}

value_from! {
    u8 => U16 as u16,
    i8 => I16 as i16,
    u16 => U16 as u16,
    i16 => I16 as i16,
    u32 => U32 as u32,
    i32 => I32 as i32,
    u64 => U64 as u64,
    i64 => I64 as i64,
    bool => Boolean as bool,
    Ipv4Addr => IpAddr as Ipv4Addr,
    String => String as String,
    &str => String as String,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::U16(v) => v.fmt(f),
            Value::I16(v) => v.fmt(f),
            Value::U32(v) => v.fmt(f),
            Value::I32(v) => v.fmt(f),
            Value::String(v) => v.fmt(f),
            Value::IpAddr(v) => v.fmt(f),
            Value::I64(v) => v.fmt(f),
            Value::U64(v) => v.fmt(f),
            Value::Boolean(v) => v.fmt(f),
        }
    }
}

/// A named set of typed attributes. Keys are unique; their order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub attributes: BTreeMap<String, Value>,
}

impl Event {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Sets an attribute, returning the value it replaced.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.insert(key.into(), value.into())
    }

    /// Builder form of [`Event::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.attributes.remove(key)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {{", self.name)?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}
