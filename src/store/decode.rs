// Boundary decoding for backend payloads
//
// The marketplace backend wraps everything in `{data: ...}` and every entity
// in `{id, attributes: {...}}`, relations included. Payloads are flattened
// here, deserialized into domain types, and validated before they reach the
// store; nothing downstream looks at raw JSON.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload has an unexpected shape: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("invalid {entity}: {reason}")]
    Invalid {
        entity: &'static str,
        reason: String,
    },
}

impl DecodeError {
    pub fn invalid(entity: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            entity,
            reason: reason.into(),
        }
    }
}

/// Domain-level checks run after deserialization
pub trait Validate {
    fn validate(&self) -> Result<(), DecodeError>;
}

impl<T: Validate> Validate for Vec<T> {
    fn validate(&self) -> Result<(), DecodeError> {
        self.iter().try_for_each(Validate::validate)
    }
}

impl<T: Validate> Validate for Option<T> {
    fn validate(&self) -> Result<(), DecodeError> {
        match self {
            Some(inner) => inner.validate(),
            None => Ok(()),
        }
    }
}

/// Flatten, deserialize and validate a backend payload
pub fn decode<T>(payload: Value) -> Result<T, DecodeError>
where
    T: DeserializeOwned + Validate,
{
    let value: T = serde_json::from_value(flatten(payload))?;
    value.validate()?;
    Ok(value)
}

/// Remove `data` and `attributes` envelopes, recursively
pub fn flatten(value: Value) -> Value {
    match value {
        Value::Object(map) => flatten_object(map),
        Value::Array(items) => Value::Array(items.into_iter().map(flatten).collect()),
        other => other,
    }
}

fn flatten_object(mut map: Map<String, Value>) -> Value {
    // `{data, meta?}` response or relation wrapper
    if map.contains_key("data") && map.keys().all(|k| k == "data" || k == "meta") {
        if let Some(data) = map.remove("data") {
            return flatten(data);
        }
    }

    // `{id, attributes}` entity
    if let Some(Value::Object(attributes)) = map.remove("attributes") {
        let mut entity = Map::new();
        for (key, value) in attributes {
            entity.insert(key, flatten(value));
        }
        for (key, value) in map {
            entity.entry(key).or_insert_with(|| flatten(value));
        }
        return Value::Object(entity);
    }

    Value::Object(
        map.into_iter()
            .map(|(key, value)| (key, flatten(value)))
            .collect(),
    )
}
