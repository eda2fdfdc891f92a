mod client;
mod sender;

pub use client::Mqtt;
pub use sender::{MqttPublishError, MqttSender};

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    //random suffix is appended when missing
    pub client_id: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub tls: bool,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
}

fn default_keep_alive_secs() -> u64 {
    60
}

impl MqttConfig {
    pub fn new_client(&self) -> Mqtt {
        let client_id = match &self.client_id {
            Some(id) => id.clone(),
            None => format!("powerwatch-{}", rand::random::<u16>() % 9000 + 1000),
        };

        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        };

        Mqtt::connect(
            &self.host,
            self.port,
            &client_id,
            credentials,
            self.tls,
            std::time::Duration::from_secs(self.keep_alive_secs),
        )
    }
}
