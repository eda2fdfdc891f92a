use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::control::{ControlLoop, Heartbeat, NotificationGateway};
use crate::core::port::FanOutPublisher;
use crate::settings::Settings;

mod adapter;
mod control;
mod core;
mod error;
mod settings;

const MQTT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::new().context("Error reading configuration")?;

    settings
        .monitoring
        .init()
        .map_err(|e| anyhow::anyhow!("Error initializing monitoring: {}", e))?;

    let mqtt = settings.mqtt.new_client();
    let sender = mqtt.sender();
    let mqtt_handle = tokio::spawn(mqtt.run());

    let source = settings.ecoflow.new_telemetry_source()?;
    let webhook = settings.webhook.as_ref().map(|w| w.new_publisher()).transpose()?;
    let publisher = FanOutPublisher::new(settings.bus.new_publisher(sender.clone()), webhook);
    let appliance = settings.appliance.new_appliance()?;
    let notifier = adapter::new_notifier(settings.telegram.as_ref())?;

    tracing::info!(
        device_id = %settings.ecoflow.device_id,
        appliance = settings.appliance.name(),
        telegram = settings.telegram.is_some(),
        webhook = settings.webhook.is_some(),
        "Starting powerwatch"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    let gateway = NotificationGateway::new(notifier.clone(), settings.control.alert_cooldown.clone());
    let control_loop = ControlLoop::new(
        &settings.ecoflow.device_id,
        settings.control.clone(),
        source,
        publisher,
        appliance,
        gateway,
    );
    let heartbeat = Heartbeat::new(settings.heartbeat.clone(), notifier);

    let heartbeat_shutdown = shutdown.child_token();
    let (summary, _) = tokio::join!(
        async {
            let summary = control_loop.run(shutdown.clone()).await;
            heartbeat_shutdown.cancel();
            summary
        },
        heartbeat.run(heartbeat_shutdown.clone()),
    );

    tracing::info!(
        "Control loop finished after {} cycles in {}, appliance is {}",
        summary.cycles,
        summary.elapsed.to_human_readable(),
        if summary.state.appliance_on { "ON" } else { "OFF" }
    );

    if let Err(e) = sender.disconnect() {
        tracing::warn!("Error disconnecting from MQTT broker: {}", e);
        mqtt_handle.abort();
    } else if tokio::time::timeout(MQTT_CLOSE_TIMEOUT, mqtt_handle).await.is_err() {
        tracing::warn!("MQTT connection not closed after {:?}, exiting anyway", MQTT_CLOSE_TIMEOUT);
    }

    Ok(())
}

async fn wait_for_signal(shutdown: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Error installing SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
