pub mod ecoflow;
pub mod homeassistant;
pub mod log_only;
pub mod mqtt;
pub mod simulated;
pub mod tasmota;
pub mod telegram;
pub mod webhook;

use serde::Deserialize;

use crate::core::{Appliance, Notifier};
use crate::error::{ConfigurationError, DeviceError, NotificationError};

use homeassistant::{HaSwitch, HomeAssistant};
use log_only::LogNotifier;
use simulated::{Simulated, SimulatedAppliance};
use tasmota::{Tasmota, TasmotaPlug};
use telegram::{Telegram, TelegramNotifier};

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ApplianceConfig {
    Tasmota(Tasmota),
    HomeAssistant(HomeAssistant),
    Simulated(Simulated),
}

impl Default for ApplianceConfig {
    fn default() -> Self {
        ApplianceConfig::Simulated(Simulated::default())
    }
}

impl ApplianceConfig {
    pub fn new_appliance(&self) -> Result<ApplianceAdapter, ConfigurationError> {
        Ok(match self {
            ApplianceConfig::Tasmota(config) => ApplianceAdapter::Tasmota(config.new_appliance()?),
            ApplianceConfig::HomeAssistant(config) => ApplianceAdapter::HomeAssistant(config.new_appliance()?),
            ApplianceConfig::Simulated(config) => ApplianceAdapter::Simulated(config.new_appliance()),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ApplianceConfig::Tasmota(_) => "tasmota",
            ApplianceConfig::HomeAssistant(_) => "homeassistant",
            ApplianceConfig::Simulated(_) => "simulated",
        }
    }
}

pub enum ApplianceAdapter {
    Tasmota(TasmotaPlug),
    HomeAssistant(HaSwitch),
    Simulated(SimulatedAppliance),
}

impl Appliance for ApplianceAdapter {
    async fn get_state(&self) -> Result<bool, DeviceError> {
        match self {
            ApplianceAdapter::Tasmota(plug) => plug.get_state().await,
            ApplianceAdapter::HomeAssistant(switch) => switch.get_state().await,
            ApplianceAdapter::Simulated(appliance) => appliance.get_state().await,
        }
    }

    async fn set_state(&self, on: bool) -> Result<bool, DeviceError> {
        match self {
            ApplianceAdapter::Tasmota(plug) => plug.set_state(on).await,
            ApplianceAdapter::HomeAssistant(switch) => switch.set_state(on).await,
            ApplianceAdapter::Simulated(appliance) => appliance.set_state(on).await,
        }
    }
}

pub fn new_notifier(telegram: Option<&Telegram>) -> Result<NotifierAdapter, ConfigurationError> {
    Ok(match telegram {
        Some(config) => NotifierAdapter::Telegram(config.new_notifier()?),
        None => NotifierAdapter::Log(LogNotifier),
    })
}

#[derive(Clone)]
pub enum NotifierAdapter {
    Telegram(TelegramNotifier),
    Log(LogNotifier),
}

impl Notifier for NotifierAdapter {
    async fn send(&self, text: &str) -> Result<(), NotificationError> {
        match self {
            NotifierAdapter::Telegram(notifier) => notifier.send(text).await,
            NotifierAdapter::Log(notifier) => notifier.send(text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_appliance_by_type() {
        let config: ApplianceConfig = serde_json::from_str(
            r#"{ "type": "tasmota", "url": "http://192.168.1.50", "timeout": "PT3S" }"#,
        )
        .unwrap();

        assert_eq!(config.name(), "tasmota");
        assert!(matches!(config.new_appliance(), Ok(ApplianceAdapter::Tasmota(_))));
    }

    #[test]
    fn home_assistant_switch_requires_entity() {
        let result = serde_json::from_str::<ApplianceConfig>(
            r#"{ "type": "home_assistant", "url": "http://ha.local:8123", "token": "abc" }"#,
        );

        assert!(result.is_err());
    }

    #[test]
    fn defaults_to_simulated_appliance() {
        assert_eq!(ApplianceConfig::default().name(), "simulated");
    }

    #[tokio::test]
    async fn falls_back_to_log_notifier() {
        let notifier = new_notifier(None).unwrap();

        assert!(matches!(notifier, NotifierAdapter::Log(_)));
        assert!(notifier.send("Appliance switched ON").await.is_ok());
    }
}
