//! Conversion between Firestore typed values and plain JSON
//!
//! Firestore's REST API wraps every field in a single-key object naming its
//! type (`{"stringValue": "x"}`, `{"mapValue": {"fields": {...}}}`, ...).
//! Records are handled as plain JSON everywhere else in the processor.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Number, Value};

use crate::errors::ProcessorError;

/// Encode a JSON value as a Firestore value
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // int64 travels as a decimal string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(fields) => json!({ "mapValue": { "fields": encode_fields(fields) } }),
    }
}

/// Encode every field of a JSON object
pub fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Firestore timestamp value
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    json!({ "timestampValue": at.to_rfc3339_opts(SecondsFormat::Micros, true) })
}

/// Decode a Firestore value into JSON. Timestamps, references and bytes
/// decode to their string form.
pub fn decode_value(value: &Value) -> Result<Value, ProcessorError> {
    let object = value
        .as_object()
        .ok_or_else(|| invalid("value is not an object", value))?;
    let (kind, inner) = object
        .iter()
        .next()
        .ok_or_else(|| invalid("value has no type", value))?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => inner
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| invalid("booleanValue", inner)),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(i.into()))
                .ok_or_else(|| invalid("integerValue", inner))
        }
        "doubleValue" => {
            let parsed = match inner {
                Value::Number(n) => n.as_f64(),
                // NaN and infinities arrive as strings
                Value::String(s) => s.parse::<f64>().ok(),
                _ => None,
            };
            Ok(parsed
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| invalid(kind, inner)),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let values = match inner.get("values") {
                Some(Value::Array(values)) => values
                    .iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>, _>>()?,
                _ => Vec::new(),
            };
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = match inner.get("fields") {
                Some(Value::Object(fields)) => decode_fields(fields)?,
                _ => Map::new(),
            };
            Ok(Value::Object(fields))
        }
        other => Err(invalid(&format!("unsupported type {}", other), inner)),
    }
}

/// Decode every field of a Firestore document
pub fn decode_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, ProcessorError> {
    fields
        .iter()
        .map(|(k, v)| Ok::<_, ProcessorError>((k.clone(), decode_value(v)?)))
        .collect()
}

fn invalid(what: &str, value: &Value) -> ProcessorError {
    ProcessorError::StoreError(format!("invalid Firestore value ({}): {}", what, value))
}
