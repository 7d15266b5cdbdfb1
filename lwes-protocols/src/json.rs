//! ## lwes-protocols::json
//! JSON projection of an event: one object whose keys are attribute names,
//! plus an optional `"Name"` key carrying the event name.

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number};

use crate::error::JsonError;
use crate::event::{Event, Value};

/// Key that carries the event name in the JSON object.
pub const NAME_KEY: &str = "Name";

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::U16(v) => serializer.serialize_u16(*v),
            Value::I16(v) => serializer.serialize_i16(*v),
            Value::U32(v) => serializer.serialize_u32(*v),
            Value::I32(v) => serializer.serialize_i32(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::IpAddr(v) => serializer.collect_str(v),
            Value::I64(v) => serializer.serialize_i64(*v),
            Value::U64(v) => serializer.serialize_u64(*v),
            Value::Boolean(v) => serializer.serialize_bool(*v),
        }
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let named = !self.name.is_empty();
        let mut map = serializer.serialize_map(Some(self.len() + usize::from(named)))?;
        if named {
            map.serialize_entry(NAME_KEY, &self.name)?;
        }
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let object = Map::<String, serde_json::Value>::deserialize(deserializer)?;
        Event::from_json_object(object).map_err(D::Error::custom)
    }
}

fn number_value(key: &str, n: &Number) -> Result<Value, JsonError> {
    if let Some(v) = n.as_i64() {
        Ok(Value::I64(v))
    } else if let Some(v) = n.as_u64() {
        Ok(Value::U64(v))
    } else {
        Err(JsonError::UnsupportedValue {
            key: key.to_owned(),
            value: serde_json::Value::Number(n.clone()),
        })
    }
}

impl Event {
    /// Builds an event from a JSON object. A string `"Name"` entry becomes the
    /// event name; integers become `I64` (`U64` above `i64::MAX`).
    pub fn from_json_object(object: Map<String, serde_json::Value>) -> Result<Self, JsonError> {
        let mut event = Event::default();
        for (key, value) in object {
            let value = match value {
                serde_json::Value::String(s) if key == NAME_KEY => {
                    event.name = s;
                    continue;
                }
                serde_json::Value::String(s) => Value::String(s),
                serde_json::Value::Bool(b) => Value::Boolean(b),
                serde_json::Value::Number(n) => number_value(&key, &n)?,
                other => return Err(JsonError::UnsupportedValue { key, value: other }),
            };
            event.attributes.insert(key, value);
        }
        Ok(event)
    }

    pub fn from_json(json: &str) -> Result<Self, JsonError> {
        match serde_json::from_str::<serde_json::Value>(json)? {
            serde_json::Value::Object(object) => Self::from_json_object(object),
            _ => Err(JsonError::NotAnObject),
        }
    }

    pub fn to_json(&self) -> Result<String, JsonError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, JsonError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn name_key_becomes_event_name() {
        let event = Event::from_json(r#"{"Name":"Login","user":"ann","ok":true,"n":-4}"#).unwrap();
        assert_eq!(event.name, "Login");
        assert_eq!(event.len(), 3);
        assert_eq!(event.get("user"), Some(&Value::String("ann".into())));
        assert_eq!(event.get("ok"), Some(&Value::Boolean(true)));
        assert_eq!(event.get("n"), Some(&Value::I64(-4)));
    }

    #[test]
    fn non_string_name_stays_an_attribute() {
        let event = Event::from_json(r#"{"Name":7}"#).unwrap();
        assert_eq!(event.name, "");
        assert_eq!(event.get(NAME_KEY), Some(&Value::I64(7)));
    }

    #[test]
    fn large_unsigned_maps_to_u64() {
        let event = Event::from_json(r#"{"big":18446744073709551615}"#).unwrap();
        assert_eq!(event.get("big"), Some(&Value::U64(u64::MAX)));
    }

    #[test]
    fn rejects_values_without_a_wire_kind() {
        for json in [r#"{"f":1.5}"#, r#"{"f":null}"#, r#"{"f":[1]}"#, r#"{"f":{}}"#] {
            assert!(
                matches!(
                    Event::from_json(json),
                    Err(JsonError::UnsupportedValue { .. })
                ),
                "{json} accepted"
            );
        }
        assert!(matches!(Event::from_json("[]"), Err(JsonError::NotAnObject)));
    }

    #[test]
    fn serializes_name_and_attributes() {
        let event = Event::new("Ping")
            .with("addr", Ipv4Addr::new(10, 1, 2, 3))
            .with("seq", 9u32);
        let json: serde_json::Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"Name": "Ping", "addr": "10.1.2.3", "seq": 9})
        );
    }

    #[test]
    fn deserialize_impl_matches_from_json() {
        let event: Event = serde_json::from_str(r#"{"Name":"A","k":"v"}"#).unwrap();
        assert_eq!(event, Event::new("A").with("k", "v"));
    }
}
