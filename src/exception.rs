use std::error::Error;
use std::fmt::Write;

use opentelemetry::logs::{AnyValue, LogRecord, Logger, LoggerProvider, Severity};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_semantic_conventions::attribute::{
    EXCEPTION_MESSAGE, EXCEPTION_STACKTRACE, EXCEPTION_TYPE, THREAD_NAME,
};

/// Instrumentation scope of the error log records.
pub const ERROR_SCOPE: &str = "honeycomb-opentelemetry.error";

/// Event name given to every error log record.
pub const ERROR_EVENT_NAME: &str = "device.crash";

/// Formats the error followed by its chain of sources, one per line.
fn source_chain<E: Error + ?Sized>(error: &E) -> String {
    let mut chain = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        // Writing to a String cannot fail.
        let _ = write!(chain, "\nCaused by: {cause}");
        source = cause.source();
    }
    chain
}

fn any_value(value: &Value) -> AnyValue {
    match value {
        Value::Bool(v) => AnyValue::Boolean(*v),
        Value::I64(v) => AnyValue::Int(*v),
        Value::F64(v) => AnyValue::Double(*v),
        Value::String(v) => AnyValue::String(v.clone()),
        other => AnyValue::String(other.to_string().into()),
    }
}

/// Records an error as an OpenTelemetry log event.
///
/// The record carries `exception.type`, `exception.message`,
/// `exception.stacktrace` (the error's source chain) and the current
/// thread's name, plus any extra `attributes`.
pub fn log_error<E: Error + ?Sized>(
    provider: &SdkLoggerProvider,
    error: &E,
    attributes: &[KeyValue],
) {
    let logger = provider.logger(ERROR_SCOPE);
    let mut record = logger.create_log_record();
    record.set_event_name(ERROR_EVENT_NAME);
    record.set_severity_number(Severity::Error);
    record.set_severity_text("ERROR");
    record.set_body(AnyValue::from(error.to_string()));

    record.add_attribute(EXCEPTION_TYPE, std::any::type_name::<E>());
    record.add_attribute(EXCEPTION_MESSAGE, error.to_string());
    record.add_attribute(EXCEPTION_STACKTRACE, source_chain(error));
    if let Some(name) = std::thread::current().name() {
        record.add_attribute(THREAD_NAME, name.to_string());
    }
    record.add_attributes(
        attributes
            .iter()
            .map(|kv| (kv.key.clone(), any_value(&kv.value))),
    );

    logger.emit(record);
}
