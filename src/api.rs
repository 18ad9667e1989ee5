use opentelemetry::global;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use tracing::warn;

use crate::config::TelemetryConfig;
use crate::error::Result;
use crate::exporter::{log_exporter, metric_exporter, span_exporter, DebugMetricExporter};
use crate::processor::{
    BaggageSpanProcessor, BoxedLogProcessor, BoxedSpanProcessor, DebugSpanProcessor,
};
use crate::resource::build_resource;
use crate::sampler::DeterministicSampler;
use crate::trace::init_subscriber;

/// Builds the SDK providers for a resolved configuration.
pub trait TelemetryProvider {
    fn build_tracer_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> Result<SdkTracerProvider>;

    fn build_meter_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> Result<SdkMeterProvider>;

    fn build_logger_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> Result<SdkLoggerProvider>;
}

/// Exports every signal over OTLP to the endpoints in the configuration.
///
/// Building a gRPC exporter needs a Tokio runtime to be running.
#[derive(Debug, Default, Clone, Copy)]
pub struct OtlpProvider;

/// Adds the sampler and span processors every tracer provider gets, in order:
/// baggage, the user's processor, then the debug dump.
fn tracer_provider_builder(config: &TelemetryConfig) -> opentelemetry_sdk::trace::TracerProviderBuilder {
    let mut builder = SdkTracerProvider::builder()
        .with_sampler(DeterministicSampler::new(config.sample_rate))
        .with_span_processor(BaggageSpanProcessor::allow_all());
    if let Some(slot) = &config.span_processor {
        match slot.take() {
            Some(processor) => {
                builder = builder.with_span_processor(BoxedSpanProcessor(processor));
            }
            None => warn!("custom span processor already installed in another tracer provider"),
        }
    }
    if config.debug {
        builder = builder.with_span_processor(DebugSpanProcessor);
    }
    builder
}

fn logger_provider_builder(config: &TelemetryConfig) -> opentelemetry_sdk::logs::LoggerProviderBuilder {
    let builder = SdkLoggerProvider::builder();
    let Some(slot) = &config.log_processor else {
        return builder;
    };
    match slot.take() {
        Some(processor) => builder.with_log_processor(BoxedLogProcessor(processor)),
        None => {
            warn!("custom log processor already installed in another logger provider");
            builder
        }
    }
}

/// Debug mode logs every metric collection next to the OTLP export.
fn meter_provider_builder(config: &TelemetryConfig) -> opentelemetry_sdk::metrics::MeterProviderBuilder {
    let builder = SdkMeterProvider::builder();
    if config.debug {
        builder.with_periodic_exporter(DebugMetricExporter::default())
    } else {
        builder
    }
}

impl TelemetryProvider for OtlpProvider {
    fn build_tracer_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> Result<SdkTracerProvider> {
        let exporter = span_exporter(&config.traces)?;
        Ok(tracer_provider_builder(config)
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build())
    }

    fn build_meter_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> Result<SdkMeterProvider> {
        let exporter = metric_exporter(&config.metrics)?;
        Ok(meter_provider_builder(config)
            .with_periodic_exporter(exporter)
            .with_resource(resource)
            .build())
    }

    fn build_logger_provider(
        &self,
        config: &TelemetryConfig,
        resource: Resource,
    ) -> Result<SdkLoggerProvider> {
        let exporter = log_exporter(&config.logs)?;
        Ok(logger_provider_builder(config)
            .with_batch_exporter(exporter)
            .with_resource(resource)
            .build())
    }
}

/// Owns the providers installed by [`init`]. Dropping it flushes pending
/// telemetry and shuts the providers down.
pub struct TelemetryGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
    logger_provider: Option<SdkLoggerProvider>,
}

impl TelemetryGuard {
    pub fn tracer_provider(&self) -> Option<&SdkTracerProvider> {
        self.tracer_provider.as_ref()
    }

    pub fn meter_provider(&self) -> Option<&SdkMeterProvider> {
        self.meter_provider.as_ref()
    }

    pub fn logger_provider(&self) -> Option<&SdkLoggerProvider> {
        self.logger_provider.as_ref()
    }

    /// Flushes and shuts down every provider, reporting the first failure.
    pub fn shutdown(mut self) -> Result<()> {
        if let Some(provider) = self.tracer_provider.take() {
            provider.force_flush()?;
            provider.shutdown()?;
        }
        if let Some(provider) = self.logger_provider.take() {
            provider.force_flush()?;
            provider.shutdown()?;
        }
        if let Some(provider) = self.meter_provider.take() {
            provider.force_flush()?;
            provider.shutdown()?;
        }
        Ok(())
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // The subscriber may already be gone, so report on stderr.
        if let Some(provider) = self.tracer_provider.take() {
            let _ = provider.force_flush();
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down tracer provider: {e}");
            }
        }
        if let Some(provider) = self.logger_provider.take() {
            let _ = provider.force_flush();
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down logger provider: {e}");
            }
        }
        if let Some(provider) = self.meter_provider.take() {
            let _ = provider.force_flush();
            if let Err(e) = provider.shutdown() {
                eprintln!("Error shutting down meter provider: {e}");
            }
        }
    }
}

/// Builds all three providers and installs them globally, along with the
/// W3C trace context and baggage propagators and the tracing subscriber.
///
/// The globals are left untouched when the subscriber cannot be installed,
/// and the new providers are shut down.
pub fn init_with_provider<P: TelemetryProvider>(
    provider: &P,
    config: &TelemetryConfig,
) -> Result<TelemetryGuard> {
    let resource = build_resource(config);
    let tracer_provider = provider.build_tracer_provider(config, resource.clone())?;
    let meter_provider = provider.build_meter_provider(config, resource.clone())?;
    let logger_provider = provider.build_logger_provider(config, resource)?;

    let guard = TelemetryGuard {
        tracer_provider: Some(tracer_provider.clone()),
        meter_provider: Some(meter_provider.clone()),
        logger_provider: Some(logger_provider.clone()),
    };

    init_subscriber(&tracer_provider, &logger_provider, config)?;

    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));
    global::set_tracer_provider(tracer_provider);
    global::set_meter_provider(meter_provider);

    Ok(guard)
}

/// Exports to Honeycomb over OTLP using a resolved configuration.
pub fn init(config: &TelemetryConfig) -> Result<TelemetryGuard> {
    init_with_provider(&OtlpProvider, config)
}

/// Resolves the configuration from the environment and initializes telemetry.
pub fn init_from_env() -> Result<TelemetryGuard> {
    let config = TelemetryConfig::from_env()?;
    init(&config)
}
