// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Conversion between invocation payload text and event maps.

use serde_json::{Map, Value};

use crate::error::CodecError;

/// Event and response shape: a string-keyed map of dynamically-typed values.
pub type Event = Map<String, Value>;

/// Marshals event maps to JSON text and back.
pub trait Codec: Send + Sync {
    /// Decode a payload into an event map.
    fn unmarshal(&self, payload: &str) -> Result<Event, CodecError>;

    /// Encode a map into payload text.
    fn marshal(&self, map: &Event) -> Result<String, CodecError>;
}

/// The default codec, backed by `serde_json`.
///
/// Integral numbers are normalized to `i64` before encoding so that the output
/// does not depend on which integer type produced the value.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn unmarshal(&self, payload: &str) -> Result<Event, CodecError> {
        match serde_json::from_str::<Value>(payload)? {
            Value::Object(map) => Ok(map),
            other => Err(CodecError::NotAnObject(json_type_name(&other))),
        }
    }

    fn marshal(&self, map: &Event) -> Result<String, CodecError> {
        let normalized = normalize_map(map);
        serde_json::to_string(&normalized).map_err(CodecError::Marshal)
    }
}

fn normalize_map(map: &Event) -> Event {
    map.iter()
        .map(|(key, value)| (key.clone(), normalize_value(value)))
        .collect()
}

fn normalize_value(value: &Value) -> Value {
    match value {
        Value::Number(number) => match number.as_i64() {
            Some(integral) => Value::from(integral),
            None => value.clone(),
        },
        Value::Object(map) => Value::Object(normalize_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(normalize_value).collect()),
        _ => value.clone(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(value: Value) -> Event {
        match value {
            Value::Object(map) => map,
            _ => panic!("test fixture must be an object"),
        }
    }

    #[test]
    fn test_unmarshal_nested_structures() {
        let map = JsonCodec
            .unmarshal(r#"{"a": 1, "b": {"c": [true, null, "x"]}, "d": 1.5}"#)
            .unwrap();

        assert_eq!(map["a"], json!(1));
        assert_eq!(map["b"]["c"], json!([true, null, "x"]));
        assert_eq!(map["d"], json!(1.5));
    }

    #[test]
    fn test_unmarshal_rejects_non_object() {
        let err = JsonCodec.unmarshal("[1, 2]").unwrap_err();
        assert!(matches!(err, CodecError::NotAnObject("array")));
    }

    #[test]
    fn test_unmarshal_rejects_malformed() {
        let err = JsonCodec.unmarshal("{ not json").unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn test_marshal_is_stable_across_integer_sources() {
        let mut from_u8 = Event::new();
        from_u8.insert("n".to_string(), Value::from(7u8));
        let mut from_u64 = Event::new();
        from_u64.insert("n".to_string(), Value::from(7u64));
        let mut from_i32 = Event::new();
        from_i32.insert("n".to_string(), Value::from(7i32));

        let a = JsonCodec.marshal(&from_u8).unwrap();
        let b = JsonCodec.marshal(&from_u64).unwrap();
        let c = JsonCodec.marshal(&from_i32).unwrap();
        assert_eq!(a, r#"{"n":7}"#);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_normalization_reaches_into_arrays_and_objects() {
        let map = event(json!({"outer": {"list": [1u32, {"deep": 2u16}]}}));
        let normalized = normalize_map(&map);
        assert_eq!(normalized["outer"]["list"][0].as_i64(), Some(1));
        assert_eq!(normalized["outer"]["list"][1]["deep"].as_i64(), Some(2));
    }

    #[test]
    fn test_encode_decode_encode_is_byte_identical() {
        let map = event(json!({
            "firstName": "Hans",
            "age": 42,
            "negative": -3,
            "ratio": 0.25,
            "big": u64::MAX,
            "flags": [true, false, null],
            "nested": {"x": {"y": [1, 2, 3]}}
        }));

        let first = JsonCodec.marshal(&map).unwrap();
        let decoded = JsonCodec.unmarshal(&first).unwrap();
        let second = JsonCodec.marshal(&decoded).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_marshal_hans_wurst() {
        let map = event(json!({"firstName": "Hans", "lastName": "Wurst"}));
        assert_eq!(
            JsonCodec.marshal(&map).unwrap(),
            r#"{"firstName":"Hans","lastName":"Wurst"}"#
        );
    }
}
