use infrastructure::{HttpClient, HttpClientConfig};
use serde::Deserialize;
use serde_json::json;

use crate::core::Appliance;
use crate::core::time::Duration;
use crate::error::{ConfigurationError, DeviceError};

#[derive(Debug, Deserialize, Clone)]
pub struct HomeAssistant {
    pub url: String,
    pub token: String,
    pub entity_id: String,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::seconds(10)
}

impl HomeAssistant {
    pub fn new_appliance(&self) -> Result<HaSwitch, ConfigurationError> {
        let client = HttpClientConfig::new(Some(self.token.clone()), self.timeout.clone().into())
            .new_tracing_client()
            .map_err(|e| ConfigurationError::Client {
                component: "homeassistant",
                reason: e.to_string(),
            })?;

        Ok(HaSwitch {
            client,
            base_url: self.url.trim_end_matches('/').to_owned(),
            entity_id: self.entity_id.clone(),
        })
    }
}

pub struct HaSwitch {
    client: HttpClient,
    base_url: String,
    entity_id: String,
}

#[derive(Debug, Deserialize)]
struct EntityState {
    state: String,
}

impl HaSwitch {
    //switch.x, light.x and input_boolean.x all understand turn_on/turn_off
    fn domain(&self) -> &str {
        self.entity_id.split_once('.').map(|(domain, _)| domain).unwrap_or("switch")
    }

    #[tracing::instrument(skip(self))]
    async fn call_service(&self, service: &str) -> Result<(), DeviceError> {
        let url = format!("{}/api/services/{}/{}", self.base_url, self.domain(), service);

        let response = self
            .client
            .post(url)
            .json(&json!({ "entity_id": self.entity_id }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeviceError::Status(response.status()));
        }

        Ok(())
    }
}

impl Appliance for HaSwitch {
    async fn get_state(&self) -> Result<bool, DeviceError> {
        let response = self
            .client
            .get(format!("{}/api/states/{}", self.base_url, self.entity_id))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeviceError::Status(response.status()));
        }

        let entity = response.json::<EntityState>().await?;
        parse_state(&entity.state)
    }

    async fn set_state(&self, on: bool) -> Result<bool, DeviceError> {
        self.call_service(if on { "turn_on" } else { "turn_off" }).await?;
        self.get_state().await
    }
}

fn parse_state(state: &str) -> Result<bool, DeviceError> {
    match state {
        "on" => Ok(true),
        "off" => Ok(false),
        other => Err(DeviceError::UnexpectedResponse(format!("entity state {}", other))),
    }
}
