use infrastructure::{HttpClient, HttpClientConfig};
use serde::{Deserialize, Serialize};

use crate::core::Notifier;
use crate::core::time::Duration;
use crate::error::{ConfigurationError, NotificationError};

#[derive(Debug, Deserialize, Clone)]
pub struct Telegram {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout: Duration,
}

fn default_base_url() -> String {
    "https://api.telegram.org".to_owned()
}

fn default_timeout() -> Duration {
    Duration::seconds(10)
}

impl Telegram {
    pub fn new_notifier(&self) -> Result<TelegramNotifier, ConfigurationError> {
        let client = HttpClientConfig::with_timeout(self.timeout.clone().into())
            .new_tracing_client()
            .map_err(|e| ConfigurationError::Client {
                component: "telegram",
                reason: e.to_string(),
            })?;

        Ok(TelegramNotifier {
            client,
            send_url: send_message_url(&self.base_url, &self.bot_token),
            chat_id: self.chat_id.clone(),
        })
    }
}

#[derive(Clone)]
pub struct TelegramNotifier {
    client: HttpClient,
    //contains the bot token, never log it
    send_url: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct BotResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl Notifier for TelegramNotifier {
    #[tracing::instrument(skip_all, fields(chat_id = %self.chat_id))]
    async fn send(&self, text: &str) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.send_url)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.json::<BotResponse>().await?;

        if body.ok {
            Ok(())
        } else {
            Err(NotificationError::Rejected(
                body.description.unwrap_or_else(|| format!("HTTP {}", status)),
            ))
        }
    }
}

fn send_message_url(base_url: &str, bot_token: &str) -> String {
    format!("{}/bot{}/sendMessage", base_url.trim_end_matches('/'), bot_token)
}
