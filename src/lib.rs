//! OpenTelemetry configuration for sending telemetry to Honeycomb.
//!
//! Configuration is resolved once from a [`ConfigSource`] (the process
//! environment by default) plus explicit builder calls, into an immutable
//! [`TelemetryConfig`]. That config drives the OTLP exporters, the
//! [`DeterministicSampler`] and the tracing subscriber.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use honeycomb_opentelemetry::{init, TelemetryConfig};
//!
//! fn main() -> Result<(), honeycomb_opentelemetry::TelemetryError> {
//!     let config = TelemetryConfig::builder()
//!         .api_key("my-api-key")
//!         .service_name("checkout")
//!         .sample_rate(10)
//!         .build()?;
//!
//!     let _guard = init(&config)?;
//!     tracing::info!("telemetry initialized");
//!     Ok(())
//! }
//! ```
//!
//! gRPC exporters need a Tokio runtime while [`init`] runs.
//!
//! # Environment Variables
//!
//! Setters on [`TelemetryConfigBuilder`] win over these; per-signal values win
//! over the general ones.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HONEYCOMB_API_KEY` | API key for every signal | - |
//! | `HONEYCOMB_{TRACES,METRICS,LOGS}_APIKEY` | Per-signal API key | - |
//! | `HONEYCOMB_DATASET` | Dataset for traces and logs (classic keys only) | - |
//! | `HONEYCOMB_METRICS_DATASET` | Dataset for metrics | - |
//! | `HONEYCOMB_API_ENDPOINT` | Base endpoint | `https://api.honeycomb.io:443` |
//! | `HONEYCOMB_{TRACES,METRICS,LOGS}_ENDPOINT` | Full per-signal endpoint | - |
//! | `SAMPLE_RATE` | Keep one in N traces | `1` |
//! | `DEBUG` | Verbose logging of config and spans | `false` |
//! | `OFFLINE_CACHING_ENABLED` | Offline buffering flag | `false` |
//! | `OTEL_SERVICE_NAME` | Service name | `unknown_service` |
//! | `OTEL_SERVICE_VERSION` | Service version | - |
//! | `OTEL_RESOURCE_ATTRIBUTES` | `key=value,...` resource attributes | - |
//! | `OTEL_{TRACES,METRICS,LOGS}_EXPORTER` | Must be `otlp` | `otlp` |
//! | `OTEL_EXPORTER_OTLP[_{SIGNAL}]_HEADERS` | `key=value,...` headers | - |
//! | `OTEL_EXPORTER_OTLP[_{SIGNAL}]_TIMEOUT` | Timeout in milliseconds | `10000` |
//! | `OTEL_EXPORTER_OTLP[_{SIGNAL}]_PROTOCOL` | `grpc`, `http/protobuf` or `http/json` | `http/protobuf` |
//! | `RUST_LOG` | Log level filter | `info`, or `debug` in debug mode |
//!
//! # Module Structure
//!
//! - [`source`]: where configuration values come from
//! - [`config`]: the builder and the resolved configuration
//! - [`sampler`]: the deterministic trace sampler
//! - [`api`]: provider construction and initialization
//! - [`processor`]: span and log processors
//! - [`exception`]: recording errors as log events

pub mod api;
pub mod config;
pub mod error;
pub mod exception;
pub mod exporter;
pub mod processor;
pub mod resource;
pub mod sampler;
pub mod source;
pub mod trace;

pub use api::{init, init_from_env, init_with_provider, OtlpProvider, TelemetryGuard, TelemetryProvider};
pub use config::{OtlpProtocol, Signal, SignalConfig, TelemetryConfig, TelemetryConfigBuilder};
pub use error::{Result, TelemetryError};
pub use exception::log_error;
pub use processor::BaggageSpanProcessor;
pub use sampler::DeterministicSampler;
pub use source::{ConfigSource, EnvSource, MapSource};
