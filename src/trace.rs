use opentelemetry::trace::TracerProvider;
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use serde_json::Value;
use tracing::{debug, warn, Subscriber};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::filter::FilterFn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::endpoint::TEAM_HEADER;
use crate::config::{Signal, TelemetryConfig};
use crate::error::Result;
use crate::processor::DEBUG_TARGET;

const REDACTED: &str = "<redacted>";

/// Build the OpenTelemetry tracing layer
pub fn build_otel_layer<S>(
    provider: &SdkTracerProvider,
    service_name: &str,
) -> OpenTelemetryLayer<S, opentelemetry_sdk::trace::Tracer>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    let tracer = provider.tracer(service_name.to_string());
    tracing_opentelemetry::layer().with_tracer(tracer)
}

/// Whether a `tracing` event should become an OpenTelemetry log record.
///
/// The SDK and the debug span dump log through `tracing` themselves; sending
/// those back into the logger provider would loop.
fn is_exported_target(target: &str) -> bool {
    !(target.starts_with("opentelemetry") || target.starts_with(DEBUG_TARGET))
}

/// Build the layer that forwards `tracing` events to the logger provider.
pub fn build_bridge_layer<S>(provider: &SdkLoggerProvider) -> impl Layer<S>
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    OpenTelemetryTracingBridge::new(provider)
        .with_filter(FilterFn::new(|metadata| is_exported_target(metadata.target())))
}

/// Build the fmt layer. Debug mode gets the verbose pretty format.
pub fn build_fmt_layer<S>(debug: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'span> LookupSpan<'span> + 'static,
{
    if debug {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .boxed()
    }
}

fn default_directive(config: &TelemetryConfig) -> &'static str {
    if config.debug {
        "debug"
    } else {
        "info"
    }
}

/// Build the env filter: `RUST_LOG` when set, otherwise by debug mode.
pub fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(config)))
}

/// The resolved configuration as JSON, with credentials hidden.
pub fn config_dump(config: &TelemetryConfig) -> Value {
    let mut dump = match serde_json::to_value(config) {
        Ok(dump) => dump,
        Err(err) => {
            warn!(error = %err, "could not serialize Honeycomb configuration");
            return Value::Null;
        }
    };
    for signal in Signal::ALL {
        let Some(signal) = dump.get_mut(signal.as_str()) else {
            continue;
        };
        if let Some(key) = signal.get_mut("api_key").filter(|key| !key.is_null()) {
            *key = Value::from(REDACTED);
        }
        if let Some(team) = signal
            .get_mut("headers")
            .and_then(|headers| headers.get_mut(TEAM_HEADER))
        {
            *team = Value::from(REDACTED);
        }
    }
    dump
}

/// Logs the resolved configuration when debug mode is on.
pub fn log_config(config: &TelemetryConfig) {
    if config.debug {
        debug!(target: DEBUG_TARGET, "Honeycomb SDK debug mode enabled");
        debug!(
            target: DEBUG_TARGET,
            config = %config_dump(config),
            "Honeycomb configuration"
        );
    }
}

/// Initialize the global tracing subscriber with all layers
pub fn init_subscriber(
    tracer_provider: &SdkTracerProvider,
    logger_provider: &SdkLoggerProvider,
    config: &TelemetryConfig,
) -> Result<()> {
    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(build_otel_layer(tracer_provider, &config.service_name))
        .with(build_bridge_layer(logger_provider))
        .with(build_fmt_layer(config.debug))
        .try_init()?;

    log_config(config);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TelemetryConfigBuilder;
    use crate::source::MapSource;
    use serde_json::json;
    use serial_test::serial;

    fn config(debug: bool) -> TelemetryConfig {
        TelemetryConfigBuilder::new(MapSource::default())
            .api_key("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa")
            .service_name("test")
            .debug(debug)
            .build()
            .unwrap()
    }

    #[test]
    #[serial]
    fn build_filter_defaults_to_info() {
        std::env::remove_var("RUST_LOG");

        let filter = build_filter(&config(false));

        assert_eq!(filter.to_string(), "info");
    }

    #[test]
    #[serial]
    fn build_filter_uses_debug_mode() {
        std::env::remove_var("RUST_LOG");

        let filter = build_filter(&config(true));

        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn sdk_and_debug_targets_are_not_exported() {
        assert!(!is_exported_target("opentelemetry_sdk"));
        assert!(!is_exported_target("opentelemetry-otlp"));
        assert!(!is_exported_target(DEBUG_TARGET));
        assert!(is_exported_target("my_app::handlers"));
    }

    #[test]
    fn config_dump_hides_credentials() {
        let dump = config_dump(&config(true));

        assert_eq!(dump["traces"]["api_key"], json!(REDACTED));
        assert_eq!(dump["logs"]["headers"][TEAM_HEADER], json!(REDACTED));
        assert_eq!(dump["service_name"], json!("test"));
        assert_eq!(dump["debug"], json!(true));
        assert!(!dump.to_string().contains("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"));
    }

    #[test]
    fn config_dump_keeps_missing_keys_null() {
        let config = TelemetryConfigBuilder::new(MapSource::default())
            .api_endpoint("http://localhost:4318")
            .build()
            .unwrap();

        let dump = config_dump(&config);

        assert_eq!(dump["metrics"]["api_key"], Value::Null);
    }

    #[test]
    fn build_otel_layer_creates_layer() {
        use tracing_subscriber::Registry;

        let provider = SdkTracerProvider::builder().build();

        let _layer = build_otel_layer::<Registry>(&provider, "test-service");
    }
}
