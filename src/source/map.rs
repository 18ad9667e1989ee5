use std::collections::HashMap;

use serde_json::Value;

use crate::error::{Result, TelemetryError};
use crate::source::ConfigSource;

/// A [`ConfigSource`] backed by an in-memory map of JSON values.
///
/// Values keep their JSON type, so asking for a string where a number was
/// stored is reported as a [`TelemetryError::TypeMismatch`]. `null` is treated
/// as unset.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    values: HashMap<String, Value>,
}

impl MapSource {
    pub fn new(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    /// Creates a source from a JSON object. Anything other than an object yields an empty source.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(object) => Self {
                values: object.into_iter().collect(),
            },
            _ => Self::default(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).filter(|value| !value.is_null())
    }
}

fn mismatch(key: &str, expected: &'static str, found: &Value) -> TelemetryError {
    TelemetryError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.to_string(),
    }
}

impl ConfigSource for MapSource {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(value)) => {
                let trimmed = value.trim();
                Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
            }
            Some(other) => Err(mismatch(key, "a string", other)),
        }
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| mismatch(key, "an integer", value)),
        }
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| mismatch(key, "a boolean", value)),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for MapSource {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}
