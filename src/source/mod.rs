//! Typed key/value sources that configuration is read from.
//!
//! A [`ConfigSource`] only has to answer three questions for a key: its
//! string, integer and boolean value. Durations, protocols and key-value lists
//! are derived from those by default methods, so every source parses them the
//! same way.
//!
//! - [`EnvSource`]: the process environment (the platform source)
//! - [`MapSource`]: an in-memory map of JSON values, for tests and embedding

mod env;
mod map;

use std::collections::HashMap;
use std::time::Duration;

use percent_encoding::percent_decode_str;

use crate::config::OtlpProtocol;
use crate::error::{Result, TelemetryError};

pub use env::EnvSource;
pub use map::MapSource;

/// A dictionary with keys and values for configuring Honeycomb.
///
/// Unset, empty and whitespace-only values are reported as `Ok(None)`. A value
/// that exists but has the wrong type is a [`TelemetryError::TypeMismatch`].
pub trait ConfigSource {
    /// Gets a string value, trimmed. Blank strings are `None`.
    fn get_string(&self, key: &str) -> Result<Option<String>>;

    fn get_int(&self, key: &str) -> Result<Option<i64>>;

    fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Gets a duration, which is represented as an integer number of milliseconds.
    fn get_duration(&self, key: &str) -> Result<Option<Duration>> {
        match self.get_int(key)? {
            Some(millis) => {
                let millis = u64::try_from(millis).map_err(|_| TelemetryError::TypeMismatch {
                    key: key.to_string(),
                    expected: "non-negative milliseconds",
                    found: millis.to_string(),
                })?;
                Ok(Some(Duration::from_millis(millis)))
            }
            None => Ok(None),
        }
    }

    fn get_protocol(&self, key: &str) -> Result<Option<OtlpProtocol>> {
        match self.get_string(key)? {
            Some(value) => OtlpProtocol::parse(&value),
            None => Ok(None),
        }
    }

    /// Gets and parses a comma-delimited list of key-value pairs.
    fn get_key_value_list(&self, key: &str) -> Result<HashMap<String, String>> {
        match self.get_string(key)? {
            Some(value) => parse_key_value_list(&value),
            None => Ok(HashMap::new()),
        }
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for Box<S> {
    fn get_string(&self, key: &str) -> Result<Option<String>> {
        (**self).get_string(key)
    }

    fn get_int(&self, key: &str) -> Result<Option<i64>> {
        (**self).get_int(key)
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        (**self).get_bool(key)
    }
}

/// Parses a list of key-value pairs, as used in resource attributes and headers:
///
/// ```text
/// key1=value1,key2=value2
/// ```
///
/// Keys and values are percent-decoded, with `+` standing for a space.
/// See <https://opentelemetry.io/docs/specs/otel/resource/sdk/#specifying-resource-information-via-an-environment-variable>
pub fn parse_key_value_list(list: &str) -> Result<HashMap<String, String>> {
    let mut result = HashMap::new();
    for pair in list.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let parts: Vec<&str> = pair.split('=').map(str::trim).collect();
        let [key, value] = parts.as_slice() else {
            return Err(TelemetryError::InvalidKeyValue(pair.to_string()));
        };
        result.insert(decode(key, pair)?, decode(value, pair)?);
    }
    Ok(result)
}

/// Every `%` must start a two-digit hex escape.
fn has_malformed_escape(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.iter().enumerate().any(|(i, &byte)| {
        byte == b'%'
            && !bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit))
    })
}

fn decode(raw: &str, pair: &str) -> Result<String> {
    if has_malformed_escape(raw) {
        return Err(TelemetryError::InvalidKeyValue(pair.to_string()));
    }
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| TelemetryError::InvalidKeyValue(pair.to_string()))
}
