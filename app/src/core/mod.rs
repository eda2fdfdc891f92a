pub mod port;
pub mod telemetry;
pub mod time;
pub mod unit;

pub use port::{Appliance, Notifier, TelemetryPublisher, TelemetrySource};
pub use telemetry::Telemetry;
