//! Endpoint, credential and header derivation for a single signal.

use std::collections::HashMap;

use http::Uri;
use lazy_static::lazy_static;
use regex::Regex;

use crate::config::{OtlpProtocol, Signal};

pub const OTLP_VERSION_HEADER: &str = "x-otlp-version";
pub const TEAM_HEADER: &str = "x-honeycomb-team";
pub const DATASET_HEADER: &str = "x-honeycomb-dataset";

/// Version of the OTLP exporters this crate is built against.
pub const OTLP_VERSION: &str = "0.31.0";

const HONEYCOMB_DOMAIN_SUFFIX: &str = ".honeycomb.io";

lazy_static! {
    static ref CLASSIC_KEY_REGEX: Regex =
        Regex::new(r"^[a-f0-9]*$").expect("failed creating classic key regex");
    static ref INGEST_CLASSIC_KEY_REGEX: Regex =
        Regex::new(r"^hc[a-z]ic_[a-z0-9]*$").expect("failed creating ingest key regex");
}

/// Returns the endpoint a signal exports to when no signal-specific endpoint
/// was configured.
///
/// gRPC exporters talk to the base endpoint directly. HTTP exporters need the
/// signal's path, joined with exactly one `/`.
pub fn signal_endpoint(base: &str, protocol: OtlpProtocol, signal: Signal) -> String {
    match protocol {
        OtlpProtocol::Grpc => base.to_string(),
        OtlpProtocol::HttpProtobuf | OtlpProtocol::HttpJson => {
            format!("{}/{}", base.trim_end_matches('/'), signal.path())
        }
    }
}

/// Whether the key is a "classic" key, which needs a dataset header to route data.
pub fn is_classic_key(key: Option<&str>) -> bool {
    match key {
        Some(key) if key.len() == 32 => CLASSIC_KEY_REGEX.is_match(key),
        Some(key) if key.len() == 64 => INGEST_CLASSIC_KEY_REGEX.is_match(key),
        _ => false,
    }
}

/// Whether the endpoint's host belongs to Honeycomb. Unparseable endpoints never do.
pub fn is_honeycomb_endpoint(endpoint: &str) -> bool {
    endpoint
        .parse::<Uri>()
        .ok()
        .and_then(|uri| uri.host().map(|host| host.ends_with(HONEYCOMB_DOMAIN_SUFFIX)))
        .unwrap_or(false)
}

/// Composes the headers for one signal. Later groups win on key collisions.
pub fn compose_headers(
    api_key: Option<&str>,
    dataset: Option<&str>,
    general: &HashMap<String, String>,
    signal: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut headers = HashMap::from([(OTLP_VERSION_HEADER.to_string(), OTLP_VERSION.to_string())]);
    headers.extend(general.iter().map(|(k, v)| (k.clone(), v.clone())));
    if let Some(key) = api_key {
        headers.insert(TEAM_HEADER.to_string(), key.to_string());
    }
    if let Some(dataset) = dataset {
        headers.insert(DATASET_HEADER.to_string(), dataset.to_string());
    }
    headers.extend(signal.iter().map(|(k, v)| (k.clone(), v.clone())));
    headers
}
