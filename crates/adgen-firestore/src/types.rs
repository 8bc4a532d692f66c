//! Firestore REST API types and JSON conversion.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{FirestoreError, FirestoreResult};

/// Firestore document value types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    NullValue(()),
    BooleanValue(bool),
    IntegerValue(String), // Firestore sends integers as strings
    DoubleValue(f64),
    TimestampValue(String),
    StringValue(String),
    ArrayValue(ArrayValue),
    MapValue(MapValue),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapValue {
    pub fields: Option<HashMap<String, Value>>,
}

/// Firestore document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Full resource name
    pub name: Option<String>,
    /// Document fields
    pub fields: Option<HashMap<String, Value>>,
    /// Create time
    pub create_time: Option<String>,
    /// Update time
    pub update_time: Option<String>,
}

impl Document {
    /// Create a new document with the given fields.
    pub fn new(fields: HashMap<String, Value>) -> Self {
        Self {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        }
    }
}

/// List documents response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsResponse {
    pub documents: Option<Vec<Document>>,
    pub next_page_token: Option<String>,
}

/// Convert a JSON value into a Firestore value.
///
/// Numbers that fit i64 become integer values; everything else double.
pub fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::NullValue(()),
        serde_json::Value::Bool(b) => Value::BooleanValue(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::IntegerValue(i.to_string())
            } else {
                Value::DoubleValue(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::StringValue(s.clone()),
        serde_json::Value::Array(items) => Value::ArrayValue(ArrayValue {
            values: Some(items.iter().map(json_to_value).collect()),
        }),
        serde_json::Value::Object(map) => Value::MapValue(MapValue {
            fields: Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), json_to_value(v)))
                    .collect(),
            ),
        }),
    }
}

/// Convert a Firestore value back into JSON.
pub fn value_to_json(value: &Value) -> FirestoreResult<serde_json::Value> {
    Ok(match value {
        Value::NullValue(()) => serde_json::Value::Null,
        Value::BooleanValue(b) => serde_json::Value::Bool(*b),
        Value::IntegerValue(s) => {
            let i: i64 = s.parse().map_err(|_| {
                FirestoreError::InvalidResponse(format!("bad integer value: {}", s))
            })?;
            serde_json::Value::from(i)
        }
        Value::DoubleValue(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::TimestampValue(s) | Value::StringValue(s) => serde_json::Value::String(s.clone()),
        Value::ArrayValue(arr) => {
            let items = arr
                .values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(value_to_json)
                .collect::<FirestoreResult<Vec<_>>>()?;
            serde_json::Value::Array(items)
        }
        Value::MapValue(map) => {
            let mut object = serde_json::Map::new();
            if let Some(fields) = &map.fields {
                for (k, v) in fields {
                    object.insert(k.clone(), value_to_json(v)?);
                }
            }
            serde_json::Value::Object(object)
        }
    })
}

/// Convert the top-level fields of a serde-serializable struct into
/// Firestore document fields.
pub fn struct_to_fields<T: Serialize>(value: &T) -> FirestoreResult<HashMap<String, Value>> {
    let json = serde_json::to_value(value)?;
    match json {
        serde_json::Value::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect()),
        _ => Err(FirestoreError::SerializationError(
            "expected a JSON object at the document root".to_string(),
        )),
    }
}

/// Reconstruct a serde-deserializable struct from document fields.
pub fn fields_to_struct<T: serde::de::DeserializeOwned>(
    fields: &HashMap<String, Value>,
) -> FirestoreResult<T> {
    let mut object = serde_json::Map::new();
    for (k, v) in fields {
        object.insert(k.clone(), value_to_json(v)?);
    }
    Ok(serde_json::from_value(serde_json::Value::Object(object))?)
}
