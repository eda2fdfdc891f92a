use std::time::Duration;

use anyhow::Context;
use reqwest::header::{self, HeaderMap};
use reqwest_middleware::ClientWithMiddleware;
use reqwest_tracing::TracingMiddleware;
use serde::Deserialize;

pub type HttpClient = ClientWithMiddleware;

#[derive(Debug, Clone, Deserialize)]
pub struct HttpClientConfig {
    bearer_token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl HttpClientConfig {
    pub fn new(bearer_token: Option<String>, timeout: Duration) -> Self {
        Self {
            bearer_token,
            timeout_secs: timeout.as_secs().max(1),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new(None, timeout)
    }

    pub fn new_tracing_client(&self) -> anyhow::Result<HttpClient> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &self.bearer_token {
            let mut auth_value = header::HeaderValue::from_str(format!("Bearer {}", token).as_str())
                .context("Bearer token contains invalid header characters")?;
            auth_value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        //every outbound call is bounded, the next cycle is the retry
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(self.timeout_secs))
            .build()?;

        Ok(reqwest_middleware::ClientBuilder::new(client)
            .with(TracingMiddleware::default())
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client_with_token() {
        let config = HttpClientConfig::new(Some("secret".to_owned()), Duration::from_secs(3));

        assert!(config.new_tracing_client().is_ok());
    }

    #[test]
    fn rejects_token_with_newline() {
        let config = HttpClientConfig::new(Some("sec\nret".to_owned()), Duration::from_secs(3));

        assert!(config.new_tracing_client().is_err());
    }

    #[test]
    fn timeout_is_at_least_one_second() {
        let config = HttpClientConfig::with_timeout(Duration::from_millis(10));

        assert_eq!(config.timeout_secs, 1);
    }
}
