use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use opentelemetry::baggage::BaggageExt;
use opentelemetry::logs::Severity;
use opentelemetry::trace::Span as _;
use opentelemetry::{Context, InstrumentationScope, KeyValue};
use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::logs::{LogProcessor, SdkLogRecord};
use opentelemetry_sdk::trace::{Span, SpanData, SpanProcessor};
use opentelemetry_sdk::Resource;
use tracing::debug;

/// Target used for the span dump written in debug mode.
pub const DEBUG_TARGET: &str = "honeycomb::debug";

type KeyFilter = dyn Fn(&str) -> bool + Send + Sync;

/// Copies baggage entries onto every span as it starts.
///
/// Baggage is not added to spans automatically; this processor does it for
/// the entries whose key passes the filter.
#[derive(Clone)]
pub struct BaggageSpanProcessor {
    filter: Arc<KeyFilter>,
}

impl BaggageSpanProcessor {
    pub fn new(filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Self {
            filter: Arc::new(filter),
        }
    }

    pub fn allow_all() -> Self {
        Self::new(|_| true)
    }
}

impl fmt::Debug for BaggageSpanProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaggageSpanProcessor").finish_non_exhaustive()
    }
}

impl SpanProcessor for BaggageSpanProcessor {
    fn on_start(&self, span: &mut Span, cx: &Context) {
        for (key, value) in cx.baggage().iter() {
            if (self.filter)(key.as_str()) {
                span.set_attribute(KeyValue::new(key.clone(), value.0.clone()));
            }
        }
    }

    fn on_end(&self, _span: SpanData) {}

    fn force_flush(&self) -> OTelSdkResult {
        Ok(())
    }

    fn shutdown(&self) -> OTelSdkResult {
        Ok(())
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> OTelSdkResult {
        Ok(())
    }
}

/// Logs every ended span. Installed when debug mode is on.
#[derive(Debug, Default)]
pub struct DebugSpanProcessor;

impl SpanProcessor for DebugSpanProcessor {
    fn on_start(&self, _span: &mut Span, _cx: &Context) {}

    fn on_end(&self, span: SpanData) {
        let duration = span
            .end_time
            .duration_since(span.start_time)
            .unwrap_or_default();
        debug!(
            target: DEBUG_TARGET,
            name = %span.name,
            trace_id = %span.span_context.trace_id(),
            span_id = %span.span_context.span_id(),
            parent_span_id = %span.parent_span_id,
            kind = ?span.span_kind,
            status = ?span.status,
            duration_ms = duration.as_millis() as u64,
            attributes = ?span.attributes,
            "span ended"
        );
    }

    fn force_flush(&self) -> OTelSdkResult {
        Ok(())
    }

    fn shutdown(&self) -> OTelSdkResult {
        Ok(())
    }

    fn shutdown_with_timeout(&self, _timeout: Duration) -> OTelSdkResult {
        Ok(())
    }
}

/// A custom processor carried by a [`TelemetryConfig`](crate::TelemetryConfig).
///
/// Providers own their processors and hand them the provider's resource, so
/// the processor is moved out of the slot by the first provider built from
/// the configuration. Clones of the configuration share the slot.
pub struct ProcessorSlot<P: ?Sized>(Arc<Mutex<Option<Box<P>>>>);

impl<P: ?Sized> ProcessorSlot<P> {
    pub fn new(processor: Box<P>) -> Self {
        Self(Arc::new(Mutex::new(Some(processor))))
    }

    /// Moves the processor out, leaving the slot empty.
    pub fn take(&self) -> Option<Box<P>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn is_installed(&self) -> bool {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).is_none()
    }
}

impl<P: ?Sized> Clone for ProcessorSlot<P> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<P: ?Sized> fmt::Debug for ProcessorSlot<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorSlot")
            .field("installed", &self.is_installed())
            .finish()
    }
}

/// Installs a boxed span processor in a tracer provider.
#[derive(Debug)]
pub struct BoxedSpanProcessor(pub Box<dyn SpanProcessor>);

impl SpanProcessor for BoxedSpanProcessor {
    fn on_start(&self, span: &mut Span, cx: &Context) {
        self.0.on_start(span, cx)
    }

    fn on_end(&self, span: SpanData) {
        self.0.on_end(span)
    }

    fn force_flush(&self) -> OTelSdkResult {
        self.0.force_flush()
    }

    fn shutdown(&self) -> OTelSdkResult {
        self.0.shutdown()
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> OTelSdkResult {
        self.0.shutdown_with_timeout(timeout)
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.0.set_resource(resource)
    }
}

/// The log counterpart of [`BoxedSpanProcessor`].
#[derive(Debug)]
pub struct BoxedLogProcessor(pub Box<dyn LogProcessor>);

impl LogProcessor for BoxedLogProcessor {
    fn emit(&self, record: &mut SdkLogRecord, scope: &InstrumentationScope) {
        self.0.emit(record, scope)
    }

    fn force_flush(&self) -> OTelSdkResult {
        self.0.force_flush()
    }

    fn shutdown(&self) -> OTelSdkResult {
        self.0.shutdown()
    }

    fn shutdown_with_timeout(&self, timeout: Duration) -> OTelSdkResult {
        self.0.shutdown_with_timeout(timeout)
    }

    fn event_enabled(&self, level: Severity, target: &str, name: Option<&str>) -> bool {
        self.0.event_enabled(level, target, name)
    }

    fn set_resource(&mut self, resource: &Resource) {
        self.0.set_resource(resource)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use opentelemetry::trace::{Tracer, TracerProvider};
    use opentelemetry::{Key, Value};
    use opentelemetry_sdk::logs::SdkLoggerProvider;
    use opentelemetry_sdk::trace::SdkTracerProvider;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Keeps every ended span for inspection.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct RecordingProcessor {
        pub(crate) spans: Arc<Mutex<Vec<SpanData>>>,
    }

    impl RecordingProcessor {
        pub(crate) fn span(&self, name: &str) -> SpanData {
            self.spans
                .lock()
                .unwrap()
                .iter()
                .find(|span| span.name == name)
                .cloned()
                .unwrap()
        }
    }

    impl SpanProcessor for RecordingProcessor {
        fn on_start(&self, _span: &mut Span, _cx: &Context) {}

        fn on_end(&self, span: SpanData) {
            self.spans.lock().unwrap().push(span);
        }

        fn force_flush(&self) -> OTelSdkResult {
            Ok(())
        }

        fn shutdown(&self) -> OTelSdkResult {
            Ok(())
        }

        fn shutdown_with_timeout(&self, _timeout: Duration) -> OTelSdkResult {
            Ok(())
        }
    }

    #[test]
    fn baggage_processor_adds_filtered_attributes() {
        let recorder = RecordingProcessor::default();
        let provider = SdkTracerProvider::builder()
            .with_span_processor(BaggageSpanProcessor::new(|key| key == "keepme"))
            .with_span_processor(recorder.clone())
            .build();
        let tracer = provider.tracer("test-scope");

        let mut parent = tracer.start("parent");
        let cx = Context::current_with_baggage(vec![
            KeyValue::new("test-key", "test-value"),
            KeyValue::new("keepme", "test-value"),
        ]);
        let mut child = tracer.start_with_context("child", &cx);
        child.end();
        parent.end();

        assert_eq!(recorder.spans.lock().unwrap().len(), 2);
        assert!(recorder.span("parent").attributes.is_empty());

        let child = recorder.span("child");
        assert_eq!(child.attributes.len(), 1);
        assert_eq!(child.attributes[0].key.as_str(), "keepme");
        assert_eq!(child.attributes[0].value, Value::from("test-value"));
    }

    #[test]
    fn allow_all_keeps_every_entry() {
        let recorder = RecordingProcessor::default();
        let provider = SdkTracerProvider::builder()
            .with_span_processor(BaggageSpanProcessor::allow_all())
            .with_span_processor(recorder.clone())
            .build();
        let tracer = provider.tracer("test-scope");

        let cx = Context::current_with_baggage(vec![
            KeyValue::new("a", "1"),
            KeyValue::new("b", "2"),
        ]);
        tracer.start_with_context("span", &cx).end();

        assert_eq!(recorder.span("span").attributes.len(), 2);
    }

    /// Remembers the resource it was given and whether it was shut down.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct LifecycleRecorder {
        pub(crate) resource: Arc<Mutex<Option<Resource>>>,
        pub(crate) shut_down: Arc<AtomicBool>,
    }

    impl LifecycleRecorder {
        pub(crate) fn service_name(&self) -> Option<Value> {
            self.resource
                .lock()
                .unwrap()
                .as_ref()
                .and_then(|resource| resource.get(&Key::new("service.name")))
        }
    }

    impl SpanProcessor for LifecycleRecorder {
        fn on_start(&self, _span: &mut Span, _cx: &Context) {}

        fn on_end(&self, _span: SpanData) {}

        fn force_flush(&self) -> OTelSdkResult {
            Ok(())
        }

        fn shutdown_with_timeout(&self, _timeout: Duration) -> OTelSdkResult {
            self.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn set_resource(&mut self, resource: &Resource) {
            *self.resource.lock().unwrap() = Some(resource.clone());
        }
    }

    impl LogProcessor for LifecycleRecorder {
        fn emit(&self, _record: &mut SdkLogRecord, _scope: &InstrumentationScope) {}

        fn force_flush(&self) -> OTelSdkResult {
            Ok(())
        }

        fn shutdown_with_timeout(&self, _timeout: Duration) -> OTelSdkResult {
            self.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn set_resource(&mut self, resource: &Resource) {
            *self.resource.lock().unwrap() = Some(resource.clone());
        }
    }

    fn checkout_resource() -> Resource {
        Resource::builder_empty()
            .with_service_name("checkout")
            .build()
    }

    #[test]
    fn boxed_span_processor_delegates() {
        let recorder = RecordingProcessor::default();
        let provider = SdkTracerProvider::builder()
            .with_span_processor(BoxedSpanProcessor(Box::new(recorder.clone())))
            .with_span_processor(DebugSpanProcessor)
            .build();

        provider.tracer("test-scope").start("boxed").end();

        assert_eq!(recorder.span("boxed").name, "boxed");
    }

    #[test]
    fn boxed_span_processor_receives_resource_and_shutdown() {
        let recorder = LifecycleRecorder::default();
        let provider = SdkTracerProvider::builder()
            .with_span_processor(BoxedSpanProcessor(Box::new(recorder.clone())))
            .with_resource(checkout_resource())
            .build();

        assert_eq!(recorder.service_name(), Some(Value::from("checkout")));

        provider.shutdown().unwrap();
        assert!(recorder.shut_down.load(Ordering::SeqCst));
    }

    #[test]
    fn boxed_log_processor_receives_resource_and_shutdown() {
        let recorder = LifecycleRecorder::default();
        let provider = SdkLoggerProvider::builder()
            .with_log_processor(BoxedLogProcessor(Box::new(recorder.clone())))
            .with_resource(checkout_resource())
            .build();

        assert_eq!(recorder.service_name(), Some(Value::from("checkout")));

        provider.shutdown().unwrap();
        assert!(recorder.shut_down.load(Ordering::SeqCst));
    }

    #[test]
    fn processor_slot_is_taken_once() {
        let slot: ProcessorSlot<dyn SpanProcessor> =
            ProcessorSlot::new(Box::new(RecordingProcessor::default()));
        let shared = slot.clone();

        assert!(!shared.is_installed());
        assert!(slot.take().is_some());
        assert!(shared.is_installed());
        assert!(shared.take().is_none());
    }

    #[test]
    fn debug_output_hides_filter() {
        let output = format!("{:?}", BaggageSpanProcessor::allow_all());

        assert_eq!(output, "BaggageSpanProcessor { .. }");
    }
}
