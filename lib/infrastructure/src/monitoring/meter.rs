use cached::proc_macro::cached;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};

const METER_NAME: &str = "powerwatch";

pub fn increment(name: &'static str, labels: &[(&str, &str)]) {
    counter(name).add(1, &attributes(labels))
}

pub fn set(name: &'static str, value: f64, labels: &[(&str, &str)]) {
    gauge(name).record(value, &attributes(labels))
}

pub fn observe_duration(name: &'static str, duration: std::time::Duration, labels: &[(&str, &str)]) {
    histogram(name).record(duration.as_secs_f64(), &attributes(labels))
}

fn attributes(labels: &[(&str, &str)]) -> Vec<KeyValue> {
    labels
        .iter()
        .map(|(key, value)| KeyValue::new(key.to_string(), value.to_string()))
        .collect()
}

fn meter() -> Meter {
    opentelemetry::global::meter(METER_NAME)
}

//Instruments are memoized per name and bound to the provider installed at first use,
//so monitoring has to be initialized before the first measurement.
#[cached]
fn counter(name: &'static str) -> Counter<u64> {
    meter().u64_counter(name).build()
}

#[cached]
fn gauge(name: &'static str) -> Gauge<f64> {
    meter().f64_gauge(name).build()
}

#[cached]
fn histogram(name: &'static str) -> Histogram<f64> {
    meter().f64_histogram(name).with_unit("s").build()
}
