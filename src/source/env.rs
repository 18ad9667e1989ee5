use std::env::{self, VarError};

use crate::error::{Result, TelemetryError};
use crate::source::ConfigSource;

/// A [`ConfigSource`] that reads from the process environment.
///
/// Every value is a string; integers and booleans are parsed from it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        let value = match env::var(key) {
            Ok(value) => value,
            Err(VarError::NotPresent) => return Ok(None),
            Err(VarError::NotUnicode(raw)) => {
                return Err(TelemetryError::TypeMismatch {
                    key: key.to_string(),
                    expected: "a UTF-8 string",
                    found: raw.to_string_lossy().into_owned(),
                })
            }
        };
        let value = value.trim();
        Ok((!value.is_empty()).then(|| value.to_string()))
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>> {
        self.get_string(key)?
            .map(|value| {
                value.parse::<i64>().map_err(|_| TelemetryError::TypeMismatch {
                    key: key.to_string(),
                    expected: "an integer",
                    found: value,
                })
            })
            .transpose()
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        self.get_string(key)?
            .map(|value| match value.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(TelemetryError::TypeMismatch {
                    key: key.to_string(),
                    expected: "a boolean",
                    found: value,
                }),
            })
            .transpose()
    }
}
