use crate::error::{DeviceError, NotificationError, PublishError, TelemetryError};

use super::Telemetry;

pub trait TelemetrySource {
    async fn fetch(&self, device_id: &str) -> Result<Telemetry, TelemetryError>;
}

pub trait TelemetryPublisher {
    async fn publish(&self, telemetry: &Telemetry) -> Result<(), PublishError>;
}

pub trait Appliance {
    async fn get_state(&self) -> Result<bool, DeviceError>;

    //Returns the state reported by the appliance after switching
    async fn set_state(&self, on: bool) -> Result<bool, DeviceError>;
}

pub trait Notifier {
    async fn send(&self, text: &str) -> Result<(), NotificationError>;
}

impl<P: TelemetryPublisher> TelemetryPublisher for Option<P> {
    async fn publish(&self, telemetry: &Telemetry) -> Result<(), PublishError> {
        match self {
            Some(publisher) => publisher.publish(telemetry).await,
            None => Ok(()),
        }
    }
}

//Both targets are always attempted, the first error is reported
pub struct FanOutPublisher<A, B>
where
    A: TelemetryPublisher,
    B: TelemetryPublisher,
{
    primary: A,
    secondary: B,
}

impl<A, B> FanOutPublisher<A, B>
where
    A: TelemetryPublisher,
    B: TelemetryPublisher,
{
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A, B> TelemetryPublisher for FanOutPublisher<A, B>
where
    A: TelemetryPublisher,
    B: TelemetryPublisher,
{
    async fn publish(&self, telemetry: &Telemetry) -> Result<(), PublishError> {
        let (primary, secondary) =
            futures::future::join(self.primary.publish(telemetry), self.secondary.publish(telemetry)).await;

        if let (Err(e), Ok(())) = (&secondary, &primary) {
            tracing::debug!("Secondary publisher failed while primary succeeded: {}", e);
        }

        primary.and(secondary)
    }
}
