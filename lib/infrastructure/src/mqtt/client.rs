use std::sync::Arc;
use std::time::Duration;

use rumqttc::v5::Event::{Incoming, Outgoing};
use rumqttc::v5::mqttbytes::v5::{ConnectProperties, Packet};
use rumqttc::v5::{AsyncClient, EventLoop, MqttOptions};
use rumqttc::Transport;

use super::MqttSender;

//Bounded so that a stalled broker fails publishing instead of queueing forever
const REQUEST_CAPACITY: usize = 10;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct Mqtt {
    client: Arc<AsyncClient>,
    event_loop: EventLoop,
    host: String,
}

impl Mqtt {
    pub fn connect(
        host: &str,
        port: u16,
        client_id: &str,
        credentials: Option<(&str, &str)>,
        tls: bool,
        keep_alive: Duration,
    ) -> Self {
        let mut mqttoptions = MqttOptions::new(client_id, host, port);
        mqttoptions.set_keep_alive(keep_alive);
        mqttoptions.set_clean_start(true);

        if let Some((username, password)) = credentials {
            mqttoptions.set_credentials(username, password);
        }

        if tls {
            mqttoptions.set_transport(Transport::tls_with_default_config());
        }

        let mut connect_props = ConnectProperties::new();
        connect_props.session_expiry_interval = 60.into();
        connect_props.max_packet_size = Some(1024 * 1024);
        mqttoptions.set_connect_properties(connect_props);

        let (client, event_loop) = AsyncClient::new(mqttoptions, REQUEST_CAPACITY);

        tracing::info!("MQTT client {} created for broker {}:{}", client_id, host, port);

        Mqtt {
            client: Arc::new(client),
            event_loop,
            host: host.to_owned(),
        }
    }

    pub fn sender(&self) -> MqttSender {
        MqttSender::new(self.client.clone())
    }

    //Drives the connection until a disconnect request was sent out
    pub async fn run(mut self) {
        loop {
            match self.event_loop.poll().await {
                Ok(Incoming(Packet::ConnAck(ack))) => {
                    tracing::info!("Connected to MQTT broker {}: {:?}", self.host, ack.code);
                }
                Ok(Incoming(Packet::PubAck(ack))) => {
                    tracing::trace!("MQTT publish {} acknowledged", ack.pkid);
                }
                Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
                    tracing::info!("Disconnected from MQTT broker {}", self.host);
                    return;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT error: {}", e);
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}
