use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use opentelemetry_otlp::{
    LogExporter, MetricExporter, SpanExporter, WithExportConfig, WithHttpConfig, WithTonicConfig,
};
use opentelemetry_sdk::error::{OTelSdkError, OTelSdkResult};
use opentelemetry_sdk::metrics::data::ResourceMetrics;
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::Temporality;
use tonic::metadata::{MetadataKey, MetadataMap, MetadataValue};
use tracing::{debug, warn};

use crate::config::{OtlpProtocol, SignalConfig};
use crate::error::Result;
use crate::processor::DEBUG_TARGET;

/// gRPC exporters carry headers as request metadata. Entries that are not
/// valid metadata are dropped.
fn metadata(headers: &HashMap<String, String>) -> MetadataMap {
    let mut metadata = MetadataMap::new();
    for (key, value) in headers {
        match (key.parse::<MetadataKey<_>>(), value.parse::<MetadataValue<_>>()) {
            (Ok(k), Ok(v)) => {
                metadata.insert(k, v);
            }
            _ => warn!(header = %key, "dropping header that is not valid gRPC metadata"),
        }
    }
    metadata
}

/// Builds the span exporter for one signal's settings.
///
/// gRPC exporters need a Tokio runtime to be running.
pub fn span_exporter(config: &SignalConfig) -> Result<SpanExporter> {
    let exporter = match config.protocol {
        OtlpProtocol::Grpc => SpanExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(config.timeout)
            .with_metadata(metadata(&config.headers))
            .build()?,
        protocol => SpanExporter::builder()
            .with_http()
            .with_endpoint(&config.endpoint)
            .with_timeout(config.timeout)
            .with_protocol(protocol.into())
            .with_headers(config.headers.clone())
            .build()?,
    };
    Ok(exporter)
}

pub fn metric_exporter(config: &SignalConfig) -> Result<MetricExporter> {
    let exporter = match config.protocol {
        OtlpProtocol::Grpc => MetricExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(config.timeout)
            .with_metadata(metadata(&config.headers))
            .build()?,
        protocol => MetricExporter::builder()
            .with_http()
            .with_endpoint(&config.endpoint)
            .with_timeout(config.timeout)
            .with_protocol(protocol.into())
            .with_headers(config.headers.clone())
            .build()?,
    };
    Ok(exporter)
}

pub fn log_exporter(config: &SignalConfig) -> Result<LogExporter> {
    let exporter = match config.protocol {
        OtlpProtocol::Grpc => LogExporter::builder()
            .with_tonic()
            .with_endpoint(&config.endpoint)
            .with_timeout(config.timeout)
            .with_metadata(metadata(&config.headers))
            .build()?,
        protocol => LogExporter::builder()
            .with_http()
            .with_endpoint(&config.endpoint)
            .with_timeout(config.timeout)
            .with_protocol(protocol.into())
            .with_headers(config.headers.clone())
            .build()?,
    };
    Ok(exporter)
}

/// Logs every collected metric. Added next to the OTLP metric exporter in
/// debug mode.
#[derive(Debug, Default)]
pub struct DebugMetricExporter {
    is_shutdown: AtomicBool,
}

impl PushMetricExporter for DebugMetricExporter {
    async fn export(&self, metrics: &ResourceMetrics) -> OTelSdkResult {
        if self.is_shutdown.load(Ordering::SeqCst) {
            return Err(OTelSdkError::AlreadyShutdown);
        }
        for scope_metrics in metrics.scope_metrics() {
            for metric in scope_metrics.metrics() {
                debug!(
                    target: DEBUG_TARGET,
                    scope = scope_metrics.scope().name(),
                    metric = metric.name(),
                    unit = metric.unit(),
                    data = ?metric.data(),
                    "metric exported"
                );
            }
        }
        Ok(())
    }

    fn force_flush(&self) -> OTelSdkResult {
        Ok(())
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> OTelSdkResult {
        self.is_shutdown.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn temporality(&self) -> Temporality {
        Temporality::Cumulative
    }
}
