use opentelemetry::{
    global,
    metrics::{Counter, Histogram, MeterProvider},
    KeyValue,
};
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::collections::HashSet;

pub struct Metrics {
    analyses_counter: Counter<u64>,
    analysis_errors_counter: Counter<u64>,
    prediction_duration: Histogram<u64>,
    _provider: SdkMeterProvider,
    pub registry: Registry,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();
        let exporter = opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()?;

        let provider = SdkMeterProvider::builder().with_reader(exporter).build();

        let meter = provider.meter("guardian_web");
        global::set_meter_provider(provider.clone());

        let analyses_counter = meter
            .u64_counter("analyses_total")
            .with_description("Total number of completed analyses by verdict")
            .build();

        let analysis_errors_counter = meter
            .u64_counter("analysis_errors_total")
            .with_description("Total number of failed analyses by error kind")
            .build();

        let boundaries = generate_boundaries((10, 50, 100, 500, 2000));

        let prediction_duration = meter
            .u64_histogram("prediction_duration_ms")
            .with_boundaries(boundaries)
            .with_description("Duration of decode, preprocessing and inference in milliseconds")
            .build();

        Ok(Metrics {
            analyses_counter,
            analysis_errors_counter,
            prediction_duration,
            _provider: provider,
            registry,
        })
    }

    pub fn record_analysis(&self, label: &str) {
        let attributes = vec![KeyValue::new("label", label.to_string())];
        self.analyses_counter.add(1, &attributes);
    }

    pub fn record_analysis_error(&self, kind: &str) {
        let attributes = vec![KeyValue::new("kind", kind.to_string())];
        self.analysis_errors_counter.add(1, &attributes);
    }

    pub fn record_prediction_duration(&self, duration_ms: u64, route: &str) {
        let attributes = vec![KeyValue::new("route", route.to_string())];
        self.prediction_duration.record(duration_ms, &attributes);
    }
}

/// Fine buckets for fast CPU inference, coarser ones for slow uploads.
fn generate_boundaries(parts: (i32, i32, i32, i32, i32)) -> Vec<f64> {
    let first_step: usize = 10;
    let middle_step: usize = 25;
    let end_step: usize = 100;
    let tail_step: usize = 500;
    let first_part = (parts.0..=parts.1).step_by(first_step);
    let middle_part = (parts.1..=parts.2).step_by(middle_step);
    let end_part = (parts.2..=parts.3).step_by(end_step);
    let tail_part = (parts.3..=parts.4).step_by(tail_step);

    let mut seen = HashSet::new();
    first_part
        .chain(middle_part)
        .chain(end_part)
        .chain(tail_part)
        .filter(|&x| seen.insert(x))
        .map(|x| x as f64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_boundaries() {
        let get = generate_boundaries((10, 50, 100, 500, 2000));
        let expected = vec![
            10.0, 20.0, 30.0, 40.0, 50.0, 75.0, 100.0, 200.0, 300.0, 400.0, 500.0, 1000.0,
            1500.0, 2000.0,
        ];

        assert_eq!(get, expected);
    }

    #[test]
    fn test_boundaries_are_sorted_and_unique() {
        let get = generate_boundaries((10, 50, 100, 500, 2000));
        assert!(get.windows(2).all(|w| w[0] < w[1]));
    }
}
