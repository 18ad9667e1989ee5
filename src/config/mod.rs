//! Resolved Honeycomb configuration.
//!
//! [`TelemetryConfigBuilder`] collects values from a
//! [`ConfigSource`](crate::source::ConfigSource) and from explicit setters,
//! and [`TelemetryConfigBuilder::build`] turns them into an immutable
//! [`TelemetryConfig`] that the telemetry pipeline reads from.

mod builder;
pub mod endpoint;
pub(crate) mod keys;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use opentelemetry_sdk::logs::LogProcessor;
use opentelemetry_sdk::trace::SpanProcessor;
use serde::Serialize;

use crate::processor::ProcessorSlot;

use crate::error::{Result, TelemetryError};

pub use builder::TelemetryConfigBuilder;

/// One of the three kinds of telemetry data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Traces,
    Metrics,
    Logs,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::Traces, Signal::Metrics, Signal::Logs];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Traces => "traces",
            Self::Metrics => "metrics",
            Self::Logs => "logs",
        }
    }

    /// The URL path an HTTP exporter for this signal posts to.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Traces => "v1/traces",
            Self::Metrics => "v1/metrics",
            Self::Logs => "v1/logs",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The protocol for OTLP to use when talking to its backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum OtlpProtocol {
    #[serde(rename = "grpc")]
    Grpc,
    #[default]
    #[serde(rename = "http/protobuf")]
    HttpProtobuf,
    #[serde(rename = "http/json")]
    HttpJson,
}

impl OtlpProtocol {
    /// Parses a protocol name. The empty string means "not set".
    pub fn parse(value: &str) -> Result<Option<Self>> {
        match value {
            "" => Ok(None),
            "grpc" => Ok(Some(Self::Grpc)),
            "http/protobuf" => Ok(Some(Self::HttpProtobuf)),
            "http/json" => Ok(Some(Self::HttpJson)),
            other => Err(TelemetryError::InvalidProtocol(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Grpc => "grpc",
            Self::HttpProtobuf => "http/protobuf",
            Self::HttpJson => "http/json",
        }
    }
}

impl fmt::Display for OtlpProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<OtlpProtocol> for opentelemetry_otlp::Protocol {
    fn from(protocol: OtlpProtocol) -> Self {
        match protocol {
            OtlpProtocol::Grpc => Self::Grpc,
            OtlpProtocol::HttpProtobuf => Self::HttpBinary,
            OtlpProtocol::HttpJson => Self::HttpJson,
        }
    }
}

/// Export settings for a single signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub headers: HashMap<String, String>,
    pub timeout: Duration,
    pub protocol: OtlpProtocol,
}

/// The set of options for how to export telemetry to Honeycomb.
///
/// Produced by [`TelemetryConfigBuilder::build`] and never mutated afterwards,
/// so it can be shared freely between threads.
///
/// These keys and defaults are defined at:
/// - <https://github.com/honeycombio/specs/blob/main/specs/otel-sdk-distro.md>
/// - <https://opentelemetry.io/docs/languages/sdk-configuration/general/>
/// - <https://opentelemetry.io/docs/languages/sdk-configuration/otlp-exporter/>
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryConfig {
    pub traces: SignalConfig,
    pub metrics: SignalConfig,
    pub logs: SignalConfig,
    /// Dataset for traces and logs. Only sent along with classic keys.
    pub dataset: Option<String>,
    pub metrics_dataset: Option<String>,
    pub service_name: String,
    pub service_version: Option<String>,
    pub resource_attributes: BTreeMap<String, String>,
    pub sample_rate: i64,
    pub debug: bool,
    pub offline_caching_enabled: bool,
    /// Installed by the first tracer provider built from this configuration.
    #[serde(skip)]
    pub span_processor: Option<ProcessorSlot<dyn SpanProcessor>>,
    /// Installed by the first logger provider built from this configuration.
    #[serde(skip)]
    pub log_processor: Option<ProcessorSlot<dyn LogProcessor>>,
}

impl TelemetryConfig {
    /// Starts a builder that reads from the process environment.
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::from_env()
    }

    /// Resolves a config from environment variables alone.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    pub fn signal(&self, signal: Signal) -> &SignalConfig {
        match signal {
            Signal::Traces => &self.traces,
            Signal::Metrics => &self.metrics,
            Signal::Logs => &self.logs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_default_is_http_protobuf() {
        assert_eq!(OtlpProtocol::default(), OtlpProtocol::HttpProtobuf);
    }

    #[test]
    fn protocol_parse_round_trips_names() {
        for protocol in [
            OtlpProtocol::Grpc,
            OtlpProtocol::HttpProtobuf,
            OtlpProtocol::HttpJson,
        ] {
            assert_eq!(OtlpProtocol::parse(protocol.as_str()).unwrap(), Some(protocol));
        }
    }

    #[test]
    fn protocol_parse_is_case_sensitive() {
        assert!(OtlpProtocol::parse("GRPC").is_err());
    }

    #[test]
    fn protocol_maps_to_otlp_protocol() {
        assert_eq!(
            opentelemetry_otlp::Protocol::from(OtlpProtocol::HttpProtobuf),
            opentelemetry_otlp::Protocol::HttpBinary
        );
        assert_eq!(
            opentelemetry_otlp::Protocol::from(OtlpProtocol::HttpJson),
            opentelemetry_otlp::Protocol::HttpJson
        );
    }

    #[test]
    fn signal_paths() {
        assert_eq!(Signal::Traces.path(), "v1/traces");
        assert_eq!(Signal::Metrics.path(), "v1/metrics");
        assert_eq!(Signal::Logs.path(), "v1/logs");
    }

    #[test]
    fn protocol_serializes_as_wire_name() {
        assert_eq!(
            serde_json::to_string(&OtlpProtocol::HttpJson).unwrap(),
            "\"http/json\""
        );
    }
}
