use std::collections::BTreeMap;

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::resource::{
    TELEMETRY_DISTRO_NAME, TELEMETRY_DISTRO_VERSION, TELEMETRY_SDK_LANGUAGE,
};

use crate::config::TelemetryConfig;

pub const HONEYCOMB_DISTRO_VERSION: &str = "honeycomb.distro.version";
pub const HONEYCOMB_DISTRO_RUNTIME_VERSION: &str = "honeycomb.distro.runtime_version";

/// Reported as the runtime version when the embedding application did not provide one.
pub const UNKNOWN_RUNTIME_VERSION: &str = "unknown";

const DISTRO_NAME: &str = env!("CARGO_PKG_NAME");
const DISTRO_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Adds the attributes identifying this distro, keeping any value the user already set.
pub fn add_distro_attributes(attributes: &mut BTreeMap<String, String>, runtime_version: Option<&str>) {
    let automatic = [
        (HONEYCOMB_DISTRO_VERSION, DISTRO_VERSION),
        (
            HONEYCOMB_DISTRO_RUNTIME_VERSION,
            runtime_version.unwrap_or(UNKNOWN_RUNTIME_VERSION),
        ),
        (TELEMETRY_DISTRO_VERSION, DISTRO_VERSION),
        (TELEMETRY_DISTRO_NAME, DISTRO_NAME),
        (TELEMETRY_SDK_LANGUAGE, "rust"),
    ];
    for (key, value) in automatic {
        attributes
            .entry(key.to_string())
            .or_insert_with(|| value.to_string());
    }
}

pub fn attributes(config: &TelemetryConfig) -> Vec<KeyValue> {
    config
        .resource_attributes
        .iter()
        .map(|(key, value)| KeyValue::new(key.clone(), value.clone()))
        .collect()
}

/// Build the resource shared by every provider.
///
/// Starts from an empty resource: the resolved attributes already account for
/// `OTEL_SERVICE_NAME` and `OTEL_RESOURCE_ATTRIBUTES`.
pub fn build_resource(config: &TelemetryConfig) -> Resource {
    Resource::builder_empty()
        .with_attributes(attributes(config))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MapSource;
    use opentelemetry::{Key, Value};
    use opentelemetry_semantic_conventions::resource::SERVICE_NAME;
    use serde_json::json;

    fn test_config() -> TelemetryConfig {
        let source = MapSource::from_json(json!({
            "HONEYCOMB_API_ENDPOINT": "http://localhost:4318",
            "OTEL_SERVICE_NAME": "test-service",
            "OTEL_RESOURCE_ATTRIBUTES": "custom.attr=value",
        }));
        crate::config::TelemetryConfigBuilder::new(source)
            .build()
            .unwrap()
    }

    #[test]
    fn distro_attributes_are_added() {
        let mut attributes = BTreeMap::new();
        add_distro_attributes(&mut attributes, None);

        assert_eq!(attributes[HONEYCOMB_DISTRO_VERSION], DISTRO_VERSION);
        assert_eq!(attributes[HONEYCOMB_DISTRO_RUNTIME_VERSION], "unknown");
        assert_eq!(attributes[TELEMETRY_DISTRO_NAME], "honeycomb-opentelemetry");
        assert_eq!(attributes[TELEMETRY_DISTRO_VERSION], DISTRO_VERSION);
        assert_eq!(attributes[TELEMETRY_SDK_LANGUAGE], "rust");
    }

    #[test]
    fn distro_attributes_keep_user_values() {
        let mut attributes =
            BTreeMap::from([(TELEMETRY_SDK_LANGUAGE.to_string(), "kotlin".to_string())]);
        add_distro_attributes(&mut attributes, Some("1.83.0"));

        assert_eq!(attributes[TELEMETRY_SDK_LANGUAGE], "kotlin");
        assert_eq!(attributes[HONEYCOMB_DISTRO_RUNTIME_VERSION], "1.83.0");
    }

    #[test]
    fn resource_has_resolved_attributes() {
        let config = test_config();

        let resource = build_resource(&config);

        assert_eq!(
            resource.get(&Key::new(SERVICE_NAME)),
            Some(Value::from("test-service"))
        );
        assert_eq!(
            resource.get(&Key::new("custom.attr")),
            Some(Value::from("value"))
        );
        assert_eq!(resource.len(), config.resource_attributes.len());
    }
}
