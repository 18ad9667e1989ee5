use opentelemetry::trace::{Link, SamplingDecision, SamplingResult, SpanKind, TraceId};
use opentelemetry::{Context, KeyValue};
use opentelemetry_sdk::trace::{Sampler, ShouldSample};
use tracing::debug;

/// Span attribute carrying the rate a trace was sampled at.
pub const SAMPLE_RATE_ATTRIBUTE: &str = "SampleRate";

/// Keeps one in `sample_rate` traces, deciding from the trace ID alone.
///
/// Every service that sees the same trace ID with the same rate makes the same
/// decision. Sampled spans carry a `SampleRate` attribute so Honeycomb can
/// reweight counts.
#[derive(Clone, Debug)]
pub struct DeterministicSampler {
    sample_rate: i64,
    inner: Sampler,
}

impl DeterministicSampler {
    pub fn new(sample_rate: i64) -> Self {
        let inner = match sample_rate {
            rate if rate < 1 => Sampler::AlwaysOff,
            1 => Sampler::AlwaysOn,
            rate => Sampler::TraceIdRatioBased(1.0 / rate as f64),
        };
        debug!(sample_rate, sampler = ?inner, "configured deterministic sampler");
        Self { sample_rate, inner }
    }

    pub fn sample_rate(&self) -> i64 {
        self.sample_rate
    }

    pub fn description(&self) -> &'static str {
        "DeterministicSampler"
    }
}

impl ShouldSample for DeterministicSampler {
    fn should_sample(
        &self,
        parent_context: Option<&Context>,
        trace_id: TraceId,
        name: &str,
        span_kind: &SpanKind,
        attributes: &[KeyValue],
        links: &[Link],
    ) -> SamplingResult {
        let mut result = self.inner.should_sample(
            parent_context,
            trace_id,
            name,
            span_kind,
            attributes,
            links,
        );
        if result.decision != SamplingDecision::Drop {
            result
                .attributes
                .push(KeyValue::new(SAMPLE_RATE_ATTRIBUTE, self.sample_rate));
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::Value;

    fn trace_id(high: u64, low: u64) -> TraceId {
        TraceId::from_bytes((((high as u128) << 64) | low as u128).to_be_bytes())
    }

    fn sample(sampler: &DeterministicSampler, trace_id: TraceId) -> SamplingResult {
        sampler.should_sample(None, trace_id, "test", &SpanKind::Internal, &[], &[])
    }

    fn sample_rate_attribute(result: &SamplingResult) -> Option<Value> {
        result
            .attributes
            .iter()
            .find(|kv| kv.key.as_str() == SAMPLE_RATE_ATTRIBUTE)
            .map(|kv| kv.value.clone())
    }

    #[test]
    fn description_is_stable() {
        assert_eq!(DeterministicSampler::new(10).description(), "DeterministicSampler");
    }

    #[test]
    fn zero_rate_drops() {
        let sampler = DeterministicSampler::new(0);

        let result = sample(&sampler, trace_id(10, 10));

        assert_eq!(result.decision, SamplingDecision::Drop);
        assert!(result.attributes.is_empty());
    }

    #[test]
    fn negative_rate_drops() {
        let sampler = DeterministicSampler::new(-5);

        assert_eq!(sample(&sampler, trace_id(10, 10)).decision, SamplingDecision::Drop);
    }

    #[test]
    fn rate_of_one_samples_everything() {
        let sampler = DeterministicSampler::new(1);

        for low in [0, 10, u64::MAX] {
            let result = sample(&sampler, trace_id(10, low));
            assert_eq!(result.decision, SamplingDecision::RecordAndSample);
            assert_eq!(sample_rate_attribute(&result), Some(Value::I64(1)));
        }
    }

    #[test]
    fn higher_rates_sample_low_trace_ids() {
        for rate in [10, 100] {
            let sampler = DeterministicSampler::new(rate);

            let result = sample(&sampler, trace_id(10, 10));

            assert_eq!(result.decision, SamplingDecision::RecordAndSample);
            assert_eq!(sample_rate_attribute(&result), Some(Value::I64(rate)));
        }
    }

    #[test]
    fn higher_rates_drop_high_trace_ids() {
        let sampler = DeterministicSampler::new(100);

        let result = sample(&sampler, trace_id(10, u64::MAX));

        assert_eq!(result.decision, SamplingDecision::Drop);
        assert_eq!(sample_rate_attribute(&result), None);
    }

    #[test]
    fn decision_is_deterministic() {
        let sampler = DeterministicSampler::new(3);
        let other = DeterministicSampler::new(3);

        for i in 0..100u64 {
            let id = trace_id(i, i.wrapping_mul(0x9E37_79B9_7F4A_7C15));
            assert_eq!(sample(&sampler, id).decision, sample(&other, id).decision);
        }
    }

    #[test]
    fn sampled_fraction_matches_rate() {
        let sampler = DeterministicSampler::new(4);
        let total = 10_000u64;

        let sampled = (0..total)
            .map(|i| trace_id(0, i.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
            .filter(|id| sample(&sampler, *id).decision == SamplingDecision::RecordAndSample)
            .count() as u64;

        let expected = total / 4;
        assert!(
            sampled.abs_diff(expected) < total / 50,
            "sampled {sampled} of {total}, expected about {expected}"
        );
    }
}
