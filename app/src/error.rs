//Only ConfigurationError is fatal. Everything else is logged by the control loop and
//the next cycle acts as the retry.

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("error loading configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("missing required configuration value `{0}`")]
    Missing(&'static str),
    #[error("invalid configuration value `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("error creating client for {component}: {reason}")]
    Client { component: &'static str, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("telemetry request returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("error decoding telemetry response: {0}")]
    Decode(String),
    #[error("telemetry API rejected request with code {code}: {message}")]
    Api { code: String, message: String },
    #[error("telemetry response is missing field `{0}`")]
    MissingField(&'static str),
    #[error("telemetry field `{field}` has invalid value {value}")]
    InvalidField { field: &'static str, value: String },
    #[error("error signing telemetry request: {0}")]
    Signing(#[from] hmac::digest::InvalidLength),
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("error serializing telemetry: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Mqtt(#[from] infrastructure::MqttPublishError),
    #[error("webhook request failed: {0}")]
    Webhook(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("appliance request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("appliance returned HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error("unexpected appliance response: {0}")]
    UnexpectedResponse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("notification channel rejected message: {0}")]
    Rejected(String),
}

impl TelemetryError {
    pub fn kind(&self) -> &'static str {
        match self {
            TelemetryError::Transport(_) => "transport",
            TelemetryError::Status(_) => "status",
            TelemetryError::Decode(_) => "decode",
            TelemetryError::Api { .. } => "api",
            TelemetryError::MissingField(_) => "missing_field",
            TelemetryError::InvalidField { .. } => "invalid_field",
            TelemetryError::Signing(_) => "signing",
        }
    }
}

//reading a response body can still time out or lose the connection
fn is_transport(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
}

impl From<reqwest::Error> for TelemetryError {
    fn from(e: reqwest::Error) -> Self {
        if is_transport(&e) {
            TelemetryError::Transport(reqwest_middleware::Error::Reqwest(e))
        } else {
            TelemetryError::Decode(e.to_string())
        }
    }
}

impl From<reqwest::Error> for DeviceError {
    fn from(e: reqwest::Error) -> Self {
        if is_transport(&e) {
            DeviceError::Transport(reqwest_middleware::Error::Reqwest(e))
        } else {
            DeviceError::UnexpectedResponse(e.to_string())
        }
    }
}

impl From<reqwest::Error> for NotificationError {
    fn from(e: reqwest::Error) -> Self {
        if is_transport(&e) {
            NotificationError::Transport(reqwest_middleware::Error::Reqwest(e))
        } else {
            NotificationError::Rejected(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    async fn connection_refused() -> reqwest::Error {
        reqwest::get("http://127.0.0.1:1/").await.unwrap_err()
    }

    //serves a single response that claims to be JSON but isn't
    async fn malformed_json() -> reqwest::Error {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let _ = socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot json!")
                .await;
        });

        reqwest::get(format!("http://{}/", addr))
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap_err()
    }

    #[tokio::test]
    async fn connection_errors_are_transport_errors() {
        let telemetry = TelemetryError::from(connection_refused().await);

        assert_eq!(telemetry.kind(), "transport");
        assert!(matches!(DeviceError::from(connection_refused().await), DeviceError::Transport(_)));
        assert!(matches!(
            NotificationError::from(connection_refused().await),
            NotificationError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let telemetry = TelemetryError::from(malformed_json().await);

        assert_eq!(telemetry.kind(), "decode");
    }
}
