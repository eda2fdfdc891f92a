mod http;
mod monitoring;
mod mqtt;

pub use monitoring::MonitoringConfig;

pub use http::client::{HttpClient, HttpClientConfig};
pub use mqtt::{Mqtt, MqttConfig, MqttPublishError, MqttSender};

pub mod meter {
    pub use super::monitoring::meter::{increment, observe_duration, set};
}
