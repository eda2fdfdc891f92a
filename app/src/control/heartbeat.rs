use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::core::Notifier;
use crate::core::time::{DateTime, Duration};

#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatConfig {
    #[serde(default = "default_interval")]
    pub interval: Duration,
    #[serde(default)]
    pub notify: bool,
}

fn default_interval() -> Duration {
    Duration::hours(1)
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            notify: false,
        }
    }
}

//Observational only: owns no control state and never talks to the appliance
pub struct Heartbeat<N: Notifier> {
    config: HeartbeatConfig,
    notifier: N,
    started_at: DateTime,
}

impl<N: Notifier> Heartbeat<N> {
    pub fn new(config: HeartbeatConfig, notifier: N) -> Self {
        Self {
            config,
            notifier,
            started_at: DateTime::now(),
        }
    }

    pub async fn run(self, shutdown: CancellationToken) {
        if !self.config.interval.is_positive() {
            tracing::info!("Heartbeat disabled");
            return;
        }

        let mut timer = tokio::time::interval(self.config.interval.clone().into());
        //first tick completes immediately
        timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = timer.tick() => self.beat().await,
            }
        }
    }

    async fn beat(&self) {
        let message = self.message();
        tracing::info!("{}", message);

        if self.config.notify {
            if let Err(e) = self.notifier.send(&message).await {
                tracing::warn!(error = %e, "Error sending heartbeat");
            }
        }
    }

    fn message(&self) -> String {
        format!("Still running, up for {}", self.started_at.elapsed().to_human_readable())
    }
}
