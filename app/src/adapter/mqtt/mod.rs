use infrastructure::MqttSender;
use serde::Deserialize;

use crate::core::{Telemetry, TelemetryPublisher};
use crate::error::PublishError;

#[derive(Debug, Deserialize, Clone)]
pub struct Bus {
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_namespace() -> String {
    "ecoflow".to_owned()
}

impl Default for Bus {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
        }
    }
}

impl Bus {
    pub fn new_publisher(&self, sender: MqttSender) -> MqttTelemetryPublisher {
        MqttTelemetryPublisher::new(sender, &self.namespace)
    }
}

pub struct MqttTelemetryPublisher {
    sender: MqttSender,
    namespace: String,
}

impl MqttTelemetryPublisher {
    pub fn new(sender: MqttSender, namespace: &str) -> Self {
        Self {
            sender,
            namespace: namespace.trim_end_matches('/').to_owned(),
        }
    }

    fn topic(&self, device_id: &str) -> String {
        status_topic(&self.namespace, device_id)
    }
}

impl TelemetryPublisher for MqttTelemetryPublisher {
    async fn publish(&self, telemetry: &Telemetry) -> Result<(), PublishError> {
        let payload = telemetry.to_json()?;
        self.sender.send_at_least_once(self.topic(&telemetry.device_id), payload)?;
        Ok(())
    }
}

fn status_topic(namespace: &str, device_id: &str) -> String {
    format!("{}/{}/status", namespace, device_id)
}
