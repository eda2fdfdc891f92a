use infrastructure::{HttpClient, HttpClientConfig};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::core::time::Duration;
use crate::core::{Telemetry, TelemetryPublisher};
use crate::error::{ConfigurationError, PublishError};

#[derive(Debug, Deserialize, Clone)]
pub struct Webhook {
    pub url: String,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

fn default_timeout() -> Duration {
    Duration::seconds(10)
}

impl Webhook {
    pub fn new_publisher(&self) -> Result<WebhookPublisher, ConfigurationError> {
        let client = HttpClientConfig::with_timeout(self.timeout.clone().into())
            .new_tracing_client()
            .map_err(|e| ConfigurationError::Client {
                component: "webhook",
                reason: e.to_string(),
            })?;

        Ok(WebhookPublisher {
            client,
            url: self.url.clone(),
        })
    }
}

//Forwards every record to an automation platform, e.g. a Make.com scenario
pub struct WebhookPublisher {
    client: HttpClient,
    url: String,
}

impl TelemetryPublisher for WebhookPublisher {
    #[tracing::instrument(skip_all)]
    async fn publish(&self, telemetry: &Telemetry) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.url)
            .json(telemetry)
            .send()
            .await
            .map_err(|e| PublishError::Webhook(e.to_string()))?;

        let status = response.status();
        tracing::debug!("Webhook responded with {}", status);

        accepted(status)
    }
}

fn accepted(status: StatusCode) -> Result<(), PublishError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(PublishError::Webhook(format!("HTTP {}", status)))
    }
}
