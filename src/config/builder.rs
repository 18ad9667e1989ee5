use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use opentelemetry_sdk::logs::LogProcessor;
use opentelemetry_sdk::trace::SpanProcessor;
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing::debug;

use crate::config::endpoint;
use crate::config::keys::{self, signal_keys};
use crate::config::{OtlpProtocol, Signal, SignalConfig, TelemetryConfig};
use crate::error::{Result, TelemetryError};
use crate::processor::ProcessorSlot;
use crate::resource::add_distro_attributes;
use crate::source::{ConfigSource, EnvSource};

/// Explicit values for one signal.
#[derive(Default)]
struct SignalOverrides {
    api_key: Option<String>,
    endpoint: Option<String>,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
    protocol: Option<OtlpProtocol>,
}

/// Values shared by every signal, already resolved.
struct Shared {
    api_key: Option<String>,
    api_endpoint: String,
    dataset: Option<String>,
    metrics_dataset: Option<String>,
    headers: HashMap<String, String>,
    timeout: Duration,
    protocol: OtlpProtocol,
}

/// Builds a [`TelemetryConfig`] from a [`ConfigSource`] and explicit overrides.
///
/// Every setter takes precedence over the value in the source. The source is
/// only read in [`build`](Self::build), so all of its errors surface there.
pub struct TelemetryConfigBuilder {
    source: Box<dyn ConfigSource>,

    api_key: Option<String>,
    dataset: Option<String>,
    metrics_dataset: Option<String>,
    api_endpoint: Option<String>,
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
    protocol: Option<OtlpProtocol>,

    traces: SignalOverrides,
    metrics: SignalOverrides,
    logs: SignalOverrides,

    sample_rate: Option<i64>,
    debug: Option<bool>,
    offline_caching_enabled: Option<bool>,

    // Written by both `service_name` and `resource_attributes`, so the last call wins.
    service_name: Option<String>,
    service_version: Option<String>,
    resource_attributes: HashMap<String, String>,
    runtime_version: Option<String>,

    span_processor: Option<ProcessorSlot<dyn SpanProcessor>>,
    log_processor: Option<ProcessorSlot<dyn LogProcessor>>,
}

impl TelemetryConfigBuilder {
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            api_key: None,
            dataset: None,
            metrics_dataset: None,
            api_endpoint: None,
            headers: HashMap::new(),
            timeout: None,
            protocol: None,
            traces: SignalOverrides::default(),
            metrics: SignalOverrides::default(),
            logs: SignalOverrides::default(),
            sample_rate: None,
            debug: None,
            offline_caching_enabled: None,
            service_name: None,
            service_version: None,
            resource_attributes: HashMap::new(),
            runtime_version: None,
            span_processor: None,
            log_processor: None,
        }
    }

    pub fn from_env() -> Self {
        Self::new(EnvSource)
    }

    fn overrides(&self, signal: Signal) -> &SignalOverrides {
        match signal {
            Signal::Traces => &self.traces,
            Signal::Metrics => &self.metrics,
            Signal::Logs => &self.logs,
        }
    }

    /// API key used by any signal without its own key.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn traces_api_key(mut self, key: impl Into<String>) -> Self {
        self.traces.api_key = Some(key.into());
        self
    }

    pub fn metrics_api_key(mut self, key: impl Into<String>) -> Self {
        self.metrics.api_key = Some(key.into());
        self
    }

    pub fn logs_api_key(mut self, key: impl Into<String>) -> Self {
        self.logs.api_key = Some(key.into());
        self
    }

    /// Dataset for traces and logs. Only sent when the signal's key is a classic key.
    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.dataset = Some(dataset.into());
        self
    }

    pub fn metrics_dataset(mut self, dataset: impl Into<String>) -> Self {
        self.metrics_dataset = Some(dataset.into());
        self
    }

    /// Base endpoint that signal paths are appended to.
    pub fn api_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.api_endpoint = Some(endpoint.into());
        self
    }

    /// Full traces endpoint, used as is.
    pub fn traces_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.traces.endpoint = Some(endpoint.into());
        self
    }

    pub fn metrics_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.metrics.endpoint = Some(endpoint.into());
        self
    }

    pub fn logs_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.logs.endpoint = Some(endpoint.into());
        self
    }

    /// Keep one in `rate` traces. Zero or less drops everything.
    pub fn sample_rate(mut self, rate: i64) -> Self {
        self.sample_rate = Some(rate);
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn offline_caching_enabled(mut self, enabled: bool) -> Self {
        self.offline_caching_enabled = Some(enabled);
        self
    }

    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    pub fn service_version(mut self, version: impl Into<String>) -> Self {
        self.service_version = Some(version.into());
        self
    }

    /// Adds resource attributes, replacing earlier values for the same keys.
    ///
    /// A `service.name` or `service.version` entry replaces whatever
    /// [`service_name`](Self::service_name) or
    /// [`service_version`](Self::service_version) set before this call.
    pub fn resource_attributes<K, V>(mut self, attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in attributes {
            let (key, value) = (key.into(), value.into());
            if key == SERVICE_NAME {
                self.service_name = Some(value.clone());
            } else if key == SERVICE_VERSION {
                self.service_version = Some(value.clone());
            }
            self.resource_attributes.insert(key, value);
        }
        self
    }

    /// Version of the runtime hosting the application, reported as
    /// `honeycomb.distro.runtime_version`.
    pub fn runtime_version(mut self, version: impl Into<String>) -> Self {
        self.runtime_version = Some(version.into());
        self
    }

    /// Headers sent by every signal. Merged over `OTEL_EXPORTER_OTLP_HEADERS`.
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        extend(&mut self.headers, headers);
        self
    }

    pub fn traces_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        extend(&mut self.traces.headers, headers);
        self
    }

    pub fn metrics_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        extend(&mut self.metrics.headers, headers);
        self
    }

    pub fn logs_headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        extend(&mut self.logs.headers, headers);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn traces_timeout(mut self, timeout: Duration) -> Self {
        self.traces.timeout = Some(timeout);
        self
    }

    pub fn metrics_timeout(mut self, timeout: Duration) -> Self {
        self.metrics.timeout = Some(timeout);
        self
    }

    pub fn logs_timeout(mut self, timeout: Duration) -> Self {
        self.logs.timeout = Some(timeout);
        self
    }

    pub fn protocol(mut self, protocol: OtlpProtocol) -> Self {
        self.protocol = Some(protocol);
        self
    }

    pub fn traces_protocol(mut self, protocol: OtlpProtocol) -> Self {
        self.traces.protocol = Some(protocol);
        self
    }

    pub fn metrics_protocol(mut self, protocol: OtlpProtocol) -> Self {
        self.metrics.protocol = Some(protocol);
        self
    }

    pub fn logs_protocol(mut self, protocol: OtlpProtocol) -> Self {
        self.logs.protocol = Some(protocol);
        self
    }

    /// An extra span processor added to the first tracer provider built
    /// from the resulting configuration.
    pub fn span_processor(mut self, processor: impl SpanProcessor + 'static) -> Self {
        let processor: Box<dyn SpanProcessor> = Box::new(processor);
        self.span_processor = Some(ProcessorSlot::new(processor));
        self
    }

    /// An extra log processor added to the first logger provider built
    /// from the resulting configuration.
    pub fn log_processor(mut self, processor: impl LogProcessor + 'static) -> Self {
        let processor: Box<dyn LogProcessor> = Box::new(processor);
        self.log_processor = Some(ProcessorSlot::new(processor));
        self
    }

    /// Resolves every value and validates the result.
    pub fn build(&self) -> Result<TelemetryConfig> {
        let source = &self.source;

        for signal in Signal::ALL {
            let key = signal_keys(signal).exporter;
            if let Some(exporter) = source.get_string(key)? {
                if !exporter.eq_ignore_ascii_case(keys::SUPPORTED_EXPORTER) {
                    return Err(TelemetryError::UnsupportedExporter { exporter, key });
                }
            }
        }

        let shared = Shared {
            api_key: or_source(&self.api_key, source.get_string(keys::HONEYCOMB_API_KEY)?),
            api_endpoint: or_source(
                &self.api_endpoint,
                source.get_string(keys::HONEYCOMB_API_ENDPOINT)?,
            )
            .unwrap_or_else(|| keys::DEFAULT_API_ENDPOINT.to_string()),
            dataset: or_source(&self.dataset, source.get_string(keys::HONEYCOMB_DATASET)?),
            metrics_dataset: or_source(
                &self.metrics_dataset,
                source.get_string(keys::HONEYCOMB_METRICS_DATASET)?,
            ),
            headers: merged(
                source.get_key_value_list(keys::OTEL_EXPORTER_OTLP_HEADERS)?,
                &self.headers,
            ),
            timeout: self
                .timeout
                .or(source.get_duration(keys::OTEL_EXPORTER_OTLP_TIMEOUT)?)
                .unwrap_or(keys::DEFAULT_TIMEOUT),
            protocol: self
                .protocol
                .or(source.get_protocol(keys::OTEL_EXPORTER_OTLP_PROTOCOL)?)
                .unwrap_or_default(),
        };

        let traces = self.resolve_signal(Signal::Traces, &shared)?;
        let metrics = self.resolve_signal(Signal::Metrics, &shared)?;
        let logs = self.resolve_signal(Signal::Logs, &shared)?;

        let (service_name, service_version, resource_attributes) = self.resolve_resource()?;

        let config = TelemetryConfig {
            traces,
            metrics,
            logs,
            dataset: shared.dataset,
            metrics_dataset: shared.metrics_dataset,
            service_name,
            service_version,
            resource_attributes,
            sample_rate: self
                .sample_rate
                .or(source.get_int(keys::SAMPLE_RATE)?)
                .unwrap_or(keys::DEFAULT_SAMPLE_RATE),
            debug: self.debug.or(source.get_bool(keys::DEBUG)?).unwrap_or(false),
            offline_caching_enabled: self
                .offline_caching_enabled
                .or(source.get_bool(keys::OFFLINE_CACHING_ENABLED)?)
                .unwrap_or(false),
            span_processor: self.span_processor.clone(),
            log_processor: self.log_processor.clone(),
        };

        debug!(
            service.name = %config.service_name,
            traces.endpoint = %config.traces.endpoint,
            sample_rate = config.sample_rate,
            "resolved Honeycomb configuration"
        );

        Ok(config)
    }

    fn resolve_signal(&self, signal: Signal, shared: &Shared) -> Result<SignalConfig> {
        let source = &self.source;
        let keys = signal_keys(signal);
        let overrides = self.overrides(signal);

        let protocol = overrides
            .protocol
            .or(source.get_protocol(keys.protocol)?)
            .unwrap_or(shared.protocol);

        let endpoint = or_source(&overrides.endpoint, source.get_string(keys.endpoint)?)
            .unwrap_or_else(|| endpoint::signal_endpoint(&shared.api_endpoint, protocol, signal));

        let api_key = or_source(&overrides.api_key, source.get_string(keys.api_key)?)
            .or_else(|| shared.api_key.clone());

        if api_key.is_none() && endpoint::is_honeycomb_endpoint(&endpoint) {
            return Err(TelemetryError::MissingApiKey { signal });
        }

        let dataset = match signal {
            Signal::Metrics => shared.metrics_dataset.as_deref(),
            Signal::Traces | Signal::Logs => shared
                .dataset
                .as_deref()
                .filter(|_| endpoint::is_classic_key(api_key.as_deref())),
        };

        let signal_headers = merged(source.get_key_value_list(keys.headers)?, &overrides.headers);
        let headers = endpoint::compose_headers(
            api_key.as_deref(),
            dataset,
            &shared.headers,
            &signal_headers,
        );

        let timeout = overrides
            .timeout
            .or(source.get_duration(keys.timeout)?)
            .unwrap_or(shared.timeout);

        Ok(SignalConfig {
            api_key,
            endpoint,
            headers,
            timeout,
            protocol,
        })
    }

    fn resolve_resource(&self) -> Result<(String, Option<String>, BTreeMap<String, String>)> {
        let source = &self.source;

        let mut attributes: BTreeMap<String, String> = source
            .get_key_value_list(keys::OTEL_RESOURCE_ATTRIBUTES)?
            .into_iter()
            .collect();
        attributes.extend(
            self.resource_attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        let service_name = or_source(&self.service_name, source.get_string(keys::OTEL_SERVICE_NAME)?)
            .or_else(|| attributes.get(SERVICE_NAME).cloned())
            .unwrap_or_else(|| keys::DEFAULT_SERVICE_NAME.to_string());
        attributes.insert(SERVICE_NAME.to_string(), service_name.clone());

        let service_version = or_source(
            &self.service_version,
            source.get_string(keys::OTEL_SERVICE_VERSION)?,
        )
        .or_else(|| attributes.get(SERVICE_VERSION).cloned());
        if let Some(version) = &service_version {
            attributes.insert(SERVICE_VERSION.to_string(), version.clone());
        }

        add_distro_attributes(&mut attributes, self.runtime_version.as_deref());

        Ok((service_name, service_version, attributes))
    }
}

fn or_source(value: &Option<String>, from_source: Option<String>) -> Option<String> {
    value.clone().or(from_source)
}

fn merged(
    mut from_source: HashMap<String, String>,
    overrides: &HashMap<String, String>,
) -> HashMap<String, String> {
    from_source.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    from_source
}

fn extend<K, V>(target: &mut HashMap<String, String>, values: impl IntoIterator<Item = (K, V)>)
where
    K: Into<String>,
    V: Into<String>,
{
    target.extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));
}
