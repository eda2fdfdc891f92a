use infrastructure::{HttpClient, HttpClientConfig};
use serde::Deserialize;
use serde_json::Value;

use crate::core::Appliance;
use crate::core::time::Duration;
use crate::error::{ConfigurationError, DeviceError};

#[derive(Debug, Deserialize, Clone)]
pub struct Tasmota {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::seconds(5)
}

impl Tasmota {
    pub fn new_appliance(&self) -> Result<TasmotaPlug, ConfigurationError> {
        let client = HttpClientConfig::with_timeout(self.timeout.clone().into())
            .new_tracing_client()
            .map_err(|e| ConfigurationError::Client {
                component: "tasmota",
                reason: e.to_string(),
            })?;

        Ok(TasmotaPlug {
            client,
            base_url: self.url.trim_end_matches('/').to_owned(),
            credentials: self.username.clone().zip(self.password.clone()),
        })
    }
}

//Smart plug driven through its local web command API
pub struct TasmotaPlug {
    client: HttpClient,
    base_url: String,
    credentials: Option<(String, String)>,
}

impl TasmotaPlug {
    #[tracing::instrument(skip(self))]
    async fn command(&self, command: &str) -> Result<bool, DeviceError> {
        let mut query = vec![("cmnd", command)];
        if let Some((user, password)) = &self.credentials {
            query.push(("user", user.as_str()));
            query.push(("password", password.as_str()));
        }

        let response = self
            .client
            .get(format!("{}/cm", self.base_url))
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DeviceError::Status(response.status()));
        }

        parse_power(&response.text().await?)
    }
}

impl Appliance for TasmotaPlug {
    async fn get_state(&self) -> Result<bool, DeviceError> {
        self.command("Power").await
    }

    async fn set_state(&self, on: bool) -> Result<bool, DeviceError> {
        self.command(if on { "Power On" } else { "Power Off" }).await
    }
}

//single-relay plugs answer with POWER, multi-relay ones with POWER1
fn parse_power(body: &str) -> Result<bool, DeviceError> {
    let value: Value = serde_json::from_str(body).map_err(|_| DeviceError::UnexpectedResponse(body.to_owned()))?;

    let power = value
        .get("POWER")
        .or_else(|| value.get("POWER1"))
        .and_then(Value::as_str);

    match power {
        Some("ON") => Ok(true),
        Some("OFF") => Ok(false),
        _ => Err(DeviceError::UnexpectedResponse(body.to_owned())),
    }
}
