use thiserror::Error;

use crate::config::Signal;

/// An error when configuring OpenTelemetry for Honeycomb.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A key-value list segment did not contain exactly one `=`, or could not be decoded.
    #[error("invalid key-value pair: {0}")]
    InvalidKeyValue(String),

    #[error("invalid protocol {0}")]
    InvalidProtocol(String),

    #[error("unsupported exporter {exporter} for {key}")]
    UnsupportedExporter { exporter: String, key: &'static str },

    #[error("missing API key: call api_key() or {}_api_key()", signal.as_str())]
    MissingApiKey { signal: Signal },

    /// The source holds a value that cannot be read as the requested type.
    #[error("{key}: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: String,
    },

    #[error("exporter error: {0}")]
    Exporter(#[from] opentelemetry_otlp::ExporterBuildError),

    #[error("initialization error: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),

    /// A provider failed to flush or shut down.
    #[error("provider error: {0}")]
    Provider(#[from] opentelemetry_sdk::error::OTelSdkError),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_names_the_signal_setter() {
        let err = TelemetryError::MissingApiKey {
            signal: Signal::Metrics,
        };

        assert_eq!(
            err.to_string(),
            "missing API key: call api_key() or metrics_api_key()"
        );
    }

    #[test]
    fn unsupported_exporter_names_the_key() {
        let err = TelemetryError::UnsupportedExporter {
            exporter: "zipkin".to_string(),
            key: "OTEL_TRACES_EXPORTER",
        };

        assert_eq!(
            err.to_string(),
            "unsupported exporter zipkin for OTEL_TRACES_EXPORTER"
        );
    }
}
