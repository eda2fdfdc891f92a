use std::sync::Arc;

use rumqttc::v5::{mqttbytes::QoS, AsyncClient};

#[derive(Debug, thiserror::Error)]
#[error("error publishing MQTT message to {topic}: {reason}")]
pub struct MqttPublishError {
    pub topic: String,
    pub reason: String,
}

#[derive(Clone)]
pub struct MqttSender {
    client: Arc<AsyncClient>,
}

impl MqttSender {
    pub(super) fn new(client: Arc<AsyncClient>) -> Self {
        Self { client }
    }

    //Never waits for the broker. Fails right away when the request queue is full.
    pub fn send_at_least_once(&self, topic: impl Into<String>, payload: impl Into<String>) -> Result<(), MqttPublishError> {
        self.publish(topic.into(), payload.into())
    }

    #[tracing::instrument(skip_all, fields(topic = %topic))]
    fn publish(&self, topic: String, payload: String) -> Result<(), MqttPublishError> {
        tracing::debug!("Publishing MQTT message to {topic}: {:?}", payload);

        self.client
            .try_publish(topic.clone(), QoS::AtLeastOnce, false, payload)
            .map_err(|e| MqttPublishError {
                topic,
                reason: e.to_string(),
            })
    }

    //Queues the disconnect request without waiting. With an unreachable broker the queue
    //may be full, the caller then has to give up on a clean close.
    pub fn disconnect(&self) -> anyhow::Result<()> {
        self.client.try_disconnect()?;
        Ok(())
    }
}
