//! Names of the configuration keys read from a source, and their defaults.

use std::time::Duration;

use crate::config::Signal;

pub const HONEYCOMB_API_KEY: &str = "HONEYCOMB_API_KEY";
pub const HONEYCOMB_DATASET: &str = "HONEYCOMB_DATASET";
pub const HONEYCOMB_METRICS_DATASET: &str = "HONEYCOMB_METRICS_DATASET";
pub const HONEYCOMB_API_ENDPOINT: &str = "HONEYCOMB_API_ENDPOINT";

pub const SAMPLE_RATE: &str = "SAMPLE_RATE";
pub const DEBUG: &str = "DEBUG";
pub const OFFLINE_CACHING_ENABLED: &str = "OFFLINE_CACHING_ENABLED";

pub const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";
pub const OTEL_SERVICE_VERSION: &str = "OTEL_SERVICE_VERSION";
pub const OTEL_RESOURCE_ATTRIBUTES: &str = "OTEL_RESOURCE_ATTRIBUTES";

pub const OTEL_EXPORTER_OTLP_HEADERS: &str = "OTEL_EXPORTER_OTLP_HEADERS";
pub const OTEL_EXPORTER_OTLP_TIMEOUT: &str = "OTEL_EXPORTER_OTLP_TIMEOUT";
pub const OTEL_EXPORTER_OTLP_PROTOCOL: &str = "OTEL_EXPORTER_OTLP_PROTOCOL";

pub const DEFAULT_API_ENDPOINT: &str = "https://api.honeycomb.io:443";
pub const DEFAULT_SERVICE_NAME: &str = "unknown_service";
pub const DEFAULT_SAMPLE_RATE: i64 = 1;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The only exporter kind this distro supports.
pub const SUPPORTED_EXPORTER: &str = "otlp";

/// Keys that exist once per signal.
pub struct SignalKeys {
    pub api_key: &'static str,
    pub endpoint: &'static str,
    pub exporter: &'static str,
    pub headers: &'static str,
    pub timeout: &'static str,
    pub protocol: &'static str,
}

const TRACES: SignalKeys = SignalKeys {
    api_key: "HONEYCOMB_TRACES_APIKEY",
    endpoint: "HONEYCOMB_TRACES_ENDPOINT",
    exporter: "OTEL_TRACES_EXPORTER",
    headers: "OTEL_EXPORTER_OTLP_TRACES_HEADERS",
    timeout: "OTEL_EXPORTER_OTLP_TRACES_TIMEOUT",
    protocol: "OTEL_EXPORTER_OTLP_TRACES_PROTOCOL",
};

const METRICS: SignalKeys = SignalKeys {
    api_key: "HONEYCOMB_METRICS_APIKEY",
    endpoint: "HONEYCOMB_METRICS_ENDPOINT",
    exporter: "OTEL_METRICS_EXPORTER",
    headers: "OTEL_EXPORTER_OTLP_METRICS_HEADERS",
    timeout: "OTEL_EXPORTER_OTLP_METRICS_TIMEOUT",
    protocol: "OTEL_EXPORTER_OTLP_METRICS_PROTOCOL",
};

const LOGS: SignalKeys = SignalKeys {
    api_key: "HONEYCOMB_LOGS_APIKEY",
    endpoint: "HONEYCOMB_LOGS_ENDPOINT",
    exporter: "OTEL_LOGS_EXPORTER",
    headers: "OTEL_EXPORTER_OTLP_LOGS_HEADERS",
    timeout: "OTEL_EXPORTER_OTLP_LOGS_TIMEOUT",
    protocol: "OTEL_EXPORTER_OTLP_LOGS_PROTOCOL",
};

pub fn signal_keys(signal: Signal) -> &'static SignalKeys {
    match signal {
        Signal::Traces => &TRACES,
        Signal::Metrics => &METRICS,
        Signal::Logs => &LOGS,
    }
}
