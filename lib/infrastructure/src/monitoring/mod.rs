pub mod meter;

use opentelemetry::trace::TracerProvider;
use opentelemetry::KeyValue;
use opentelemetry_otlp::{ExporterBuildError, WithExportConfig};
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use std::error::Error;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

//KNOWN ISSUES:
// - EnvFilter has to be attached per layer, a global filter drops the spans exported via OTLP

#[derive(Debug, Clone, serde::Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    #[serde(default)]
    pub logs: EnvFilterConfig,
    #[serde(default)]
    pub json: bool,
    pub otlp: Option<OtlpConfig>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct EnvFilterConfig {
    pub default_level: String,
    #[serde(default)]
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct OtlpConfig {
    pub url: String,
    #[serde(default = "default_metrics_interval_secs")]
    pub metrics_interval_secs: u64,
}

fn default_service_name() -> String {
    "powerwatch".to_owned()
}

fn default_metrics_interval_secs() -> u64 {
    15
}

impl Default for EnvFilterConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_owned(),
            filters: vec![],
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            logs: EnvFilterConfig::default(),
            json: false,
            otlp: None,
        }
    }
}

impl TryInto<EnvFilter> for EnvFilterConfig {
    type Error = tracing_subscriber::filter::ParseError;

    fn try_into(self) -> Result<EnvFilter, Self::Error> {
        EnvFilter::builder()
            .with_default_directive(self.default_level.parse()?)
            .parse(self.filters.join(","))
    }
}

impl MonitoringConfig {
    pub fn init(&self) -> Result<(), Box<dyn Error>> {
        let fmt_filter: EnvFilter = self.logs.clone().try_into()?;
        let fmt_layer = if self.json {
            tracing_subscriber::fmt::layer().json().with_filter(fmt_filter).boxed()
        } else {
            tracing_subscriber::fmt::layer().with_filter(fmt_filter).boxed()
        };

        match &self.otlp {
            Some(otlp_config) => {
                let resource = Resource::builder()
                    .with_attribute(KeyValue::new("service.name", self.service_name.clone()))
                    .build();

                opentelemetry::global::set_text_map_propagator(TraceContextPropagator::default());

                let tracer_provider = init_traces(resource.clone(), &otlp_config.url)?;
                let tracer = tracer_provider.tracer(self.service_name.to_owned());
                let tracing_filter: EnvFilter = self.logs.clone().try_into()?;
                let tracing_layer = OpenTelemetryLayer::new(tracer).with_filter(tracing_filter);

                let metrics = init_metrics(resource, otlp_config)?;
                opentelemetry::global::set_meter_provider(metrics);

                tracing_subscriber::registry()
                    .with(fmt_layer)
                    .with(tracing_layer)
                    .try_init()?;
            }
            None => {
                tracing_subscriber::registry().with(fmt_layer).try_init()?;
            }
        }

        Ok(())
    }
}

fn init_traces(resource: Resource, url: &str) -> Result<SdkTracerProvider, ExporterBuildError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(url)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_batch_exporter(exporter)
        .build())
}

fn init_metrics(resource: Resource, config: &OtlpConfig) -> Result<SdkMeterProvider, ExporterBuildError> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.url.clone())
        .build()?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(std::time::Duration::from_secs(config.metrics_interval_secs))
        .build();

    Ok(SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build())
}
