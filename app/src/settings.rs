use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use infrastructure::{MonitoringConfig, MqttConfig};
use serde::Deserialize;

use crate::adapter::ApplianceConfig;
use crate::adapter::ecoflow::EcoFlow;
use crate::adapter::mqtt::Bus;
use crate::adapter::telegram::Telegram;
use crate::adapter::webhook::Webhook;
use crate::control::{ControlConfig, HeartbeatConfig};
use crate::core::time::Duration;
use crate::core::unit::Watt;
use crate::error::ConfigurationError;

const CONFIG_PATH_VAR: &str = "POWERWATCH_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub ecoflow: EcoFlow,
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub bus: Bus,
    pub webhook: Option<Webhook>,
    #[serde(default)]
    pub appliance: ApplianceConfig,
    pub telegram: Option<Telegram>,
    pub control: ControlConfig,
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

impl Settings {
    //config file is optional, everything can come from POWERWATCH__SECTION__KEY variables
    pub fn new() -> Result<Self, ConfigurationError> {
        let path = std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());

        let builder = Config::builder().add_source(File::with_name(&path).required(false));
        Self::load(builder)
    }

    fn load(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigurationError> {
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("POWERWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    #[cfg(test)]
    fn from_toml(toml: &str) -> Result<Self, ConfigurationError> {
        use config::FileFormat;

        Self::load(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        not_blank("ecoflow.access_key", &self.ecoflow.access_key)?;
        not_blank("ecoflow.secret_key", &self.ecoflow.secret_key)?;
        not_blank("ecoflow.device_id", &self.ecoflow.device_id)?;
        not_blank("ecoflow.base_url", &self.ecoflow.base_url)?;
        positive("ecoflow.timeout", &self.ecoflow.timeout)?;

        not_blank("mqtt.host", &self.mqtt.host)?;
        if self.mqtt.port == 0 {
            return Err(invalid("mqtt.port", "must not be 0"));
        }
        if self.mqtt.username.is_some() != self.mqtt.password.is_some() {
            return Err(invalid("mqtt.username", "username and password must be set together"));
        }
        not_blank("bus.namespace", &self.bus.namespace)?;

        if let Some(webhook) = &self.webhook {
            not_blank("webhook.url", &webhook.url)?;
        }

        match &self.appliance {
            ApplianceConfig::Tasmota(tasmota) => not_blank("appliance.url", &tasmota.url)?,
            ApplianceConfig::HomeAssistant(ha) => {
                not_blank("appliance.url", &ha.url)?;
                not_blank("appliance.token", &ha.token)?;
                not_blank("appliance.entity_id", &ha.entity_id)?;
            }
            ApplianceConfig::Simulated(_) => {}
        }

        if let Some(telegram) = &self.telegram {
            not_blank("telegram.bot_token", &telegram.bot_token)?;
            not_blank("telegram.chat_id", &telegram.chat_id)?;
        }

        self.validate_control()
    }

    fn validate_control(&self) -> Result<(), ConfigurationError> {
        let control = &self.control;

        if !control.battery_threshold.is_valid() {
            return Err(invalid("control.battery_threshold", "must be between 0 and 100"));
        }
        if !control.critical_battery.is_valid() {
            return Err(invalid("control.critical_battery", "must be between 0 and 100"));
        }
        if !control.power_threshold.0.is_finite() || control.power_threshold < Watt(0.0) {
            return Err(invalid("control.power_threshold", "must not be negative"));
        }
        if !control.high_consumption.0.is_finite() || control.high_consumption <= Watt(0.0) {
            return Err(invalid("control.high_consumption", "must be positive"));
        }
        if control.schedule().is_empty() {
            return Err(invalid(
                "control.schedule_start",
                format!("schedule window {} is empty", control.schedule()),
            ));
        }

        positive("control.poll_interval", &control.poll_interval)?;
        if control.alert_cooldown < Duration::zero() {
            return Err(invalid("control.alert_cooldown", "must not be negative"));
        }
        if control.max_cycles == Some(0) {
            return Err(invalid("control.max_cycles", "must be at least 1"));
        }
        if let Some(max_runtime) = &control.max_runtime {
            positive("control.max_runtime", max_runtime)?;
        }

        Ok(())
    }
}

fn not_blank(key: &'static str, value: &str) -> Result<(), ConfigurationError> {
    if value.trim().is_empty() {
        Err(ConfigurationError::Missing(key))
    } else {
        Ok(())
    }
}

fn positive(key: &'static str, value: &Duration) -> Result<(), ConfigurationError> {
    if value.is_positive() {
        Ok(())
    } else {
        Err(invalid(key, format!("must be positive, got {}", value)))
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError::Invalid {
        key,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::unit::Percent;

    const SAMPLE: &str = r#"
        [ecoflow]
        access_key = "Fp4SvIprYSDPXtYJidEtUAd1o"
        secret_key = "WIbFEKre0s6sLnh4ei7SPUeYnptHG6V"
        device_id = "R611ZAB6XG7J1240"

        [mqtt]
        host = "broker.example.com"
        port = 8883
        username = "powerwatch"
        password = "secret"
        tls = true

        [appliance]
        type = "tasmota"
        url = "http://192.168.1.50"

        [control]
        battery_threshold = 27
        power_threshold = 100
        schedule_start = "08:00"
        schedule_end = "14:00"
        poll_interval = "PT1M"
        max_cycles = 300
    "#;

    fn with_section(extra: &str) -> String {
        format!("{}\n{}", SAMPLE, extra)
    }

    #[test]
    fn loads_sample_with_defaults() {
        let settings = Settings::from_toml(SAMPLE).unwrap();

        assert_eq!(settings.ecoflow.base_url, "https://api.ecoflow.com");
        assert_eq!(settings.bus.namespace, "ecoflow");
        assert!(settings.mqtt.tls);
        assert_eq!(settings.appliance.name(), "tasmota");
        assert!(settings.telegram.is_none());
        assert!(settings.webhook.is_none());
        assert_eq!(settings.control.battery_threshold, Percent(27.0));
        assert_eq!(settings.control.poll_interval, Duration::minutes(1));
        assert_eq!(settings.control.max_cycles, Some(300));
        assert_eq!(settings.heartbeat.interval, Duration::hours(1));
        assert_eq!(settings.monitoring.service_name, "powerwatch");
    }

    #[test]
    fn missing_section_fails_to_load() {
        let toml = SAMPLE.replace("[ecoflow]", "[vendor]");

        assert!(matches!(Settings::from_toml(&toml), Err(ConfigurationError::Load(_))));
    }

    #[test]
    fn blank_credentials_are_rejected() {
        let toml = SAMPLE.replace(
            r#"secret_key = "WIbFEKre0s6sLnh4ei7SPUeYnptHG6V""#,
            r#"secret_key = "  ""#,
        );

        assert!(matches!(
            Settings::from_toml(&toml),
            Err(ConfigurationError::Missing("ecoflow.secret_key"))
        ));
    }

    #[test]
    fn battery_threshold_out_of_range_is_rejected() {
        let toml = SAMPLE.replace("battery_threshold = 27", "battery_threshold = 127");

        assert!(matches!(
            Settings::from_toml(&toml),
            Err(ConfigurationError::Invalid {
                key: "control.battery_threshold",
                ..
            })
        ));
    }

    #[test]
    fn empty_schedule_window_is_rejected() {
        let toml = SAMPLE.replace(r#"schedule_end = "14:00""#, r#"schedule_end = "08:00""#);

        assert!(matches!(
            Settings::from_toml(&toml),
            Err(ConfigurationError::Invalid {
                key: "control.schedule_start",
                ..
            })
        ));
    }

    #[test]
    fn schedule_window_may_cross_midnight() {
        let toml = SAMPLE
            .replace(r#"schedule_start = "08:00""#, r#"schedule_start = "22:00""#)
            .replace(r#"schedule_end = "14:00""#, r#"schedule_end = "06:00""#);

        assert!(Settings::from_toml(&toml).is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let toml = SAMPLE.replace(r#"poll_interval = "PT1M""#, r#"poll_interval = "PT0S""#);

        assert!(matches!(
            Settings::from_toml(&toml),
            Err(ConfigurationError::Invalid {
                key: "control.poll_interval",
                ..
            })
        ));
    }

    #[test]
    fn zero_cycle_budget_is_rejected() {
        let toml = SAMPLE.replace("max_cycles = 300", "max_cycles = 0");

        assert!(matches!(
            Settings::from_toml(&toml),
            Err(ConfigurationError::Invalid {
                key: "control.max_cycles",
                ..
            })
        ));
    }

    #[test]
    fn telegram_requires_chat_id() {
        let toml = with_section(
            r#"
            [telegram]
            bot_token = "123:abc"
            chat_id = ""
        "#,
        );

        assert!(matches!(
            Settings::from_toml(&toml),
            Err(ConfigurationError::Missing("telegram.chat_id"))
        ));
    }

    #[test]
    fn mqtt_username_without_password_is_rejected() {
        let toml = SAMPLE.replace(r#"password = "secret""#, "");

        assert!(matches!(
            Settings::from_toml(&toml),
            Err(ConfigurationError::Invalid { key: "mqtt.username", .. })
        ));
    }
}
