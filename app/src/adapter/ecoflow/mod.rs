mod client;
mod signer;

pub use client::EcoFlowClient;

use infrastructure::HttpClientConfig;
use serde::Deserialize;

use crate::core::time::Duration;
use crate::error::ConfigurationError;

use signer::Signer;

#[derive(Debug, Deserialize, Clone)]
pub struct EcoFlow {
    pub access_key: String,
    pub secret_key: String,
    pub device_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

fn default_base_url() -> String {
    "https://api.ecoflow.com".to_owned()
}

fn default_timeout() -> Duration {
    Duration::seconds(10)
}

impl EcoFlow {
    pub fn new_telemetry_source(&self) -> Result<EcoFlowClient, ConfigurationError> {
        let client = HttpClientConfig::with_timeout(self.timeout.clone().into())
            .new_tracing_client()
            .map_err(|e| ConfigurationError::Client {
                component: "ecoflow",
                reason: e.to_string(),
            })?;

        let signer = Signer::new(&self.access_key, &self.secret_key);

        Ok(EcoFlowClient::new(client, &self.base_url, signer))
    }
}
