mod decision;
mod heartbeat;
mod notification;
mod runner;

use std::collections::HashMap;
use std::fmt::Display;

use serde::Deserialize;

use crate::core::time::{DailyTimeRange, DateTime, Duration, Time};
use crate::core::unit::{Percent, Watt};

pub use decision::decide;
pub use heartbeat::{Heartbeat, HeartbeatConfig};
pub use notification::NotificationGateway;
pub use runner::{ControlLoop, RunSummary};

#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    pub battery_threshold: Percent,
    pub power_threshold: Watt,
    pub schedule_start: Time,
    pub schedule_end: Time,
    #[serde(default = "default_critical_battery")]
    pub critical_battery: Percent,
    #[serde(default = "default_high_consumption")]
    pub high_consumption: Watt,
    #[serde(default = "default_alert_cooldown")]
    pub alert_cooldown: Duration,
    #[serde(default = "default_poll_interval")]
    pub poll_interval: Duration,
    pub max_cycles: Option<u32>,
    pub max_runtime: Option<Duration>,
}

fn default_critical_battery() -> Percent {
    Percent(10.0)
}

fn default_high_consumption() -> Watt {
    Watt(1800.0)
}

fn default_alert_cooldown() -> Duration {
    Duration::minutes(30)
}

fn default_poll_interval() -> Duration {
    Duration::seconds(60)
}

impl ControlConfig {
    pub fn schedule(&self) -> DailyTimeRange {
        DailyTimeRange::new(self.schedule_start, self.schedule_end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub appliance_on: bool,
    pub override_active: bool,
    pub last_alert_at: Option<DateTime>,
    //one entry per transition kind, holding the state change that was announced last
    pub last_transition: HashMap<AlertKind, (AlertKey, DateTime)>,
}

impl ControlState {
    pub fn new(appliance_on: bool) -> Self {
        Self {
            appliance_on,
            override_active: false,
            last_alert_at: None,
            last_transition: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    OverrideActivated { state_of_charge: Percent, watts_out: Watt },
    CriticalBattery { state_of_charge: Percent },
    HighConsumption { watts_out: Watt },
    ApplianceSwitched { on: bool },
    Started { appliance_on: bool },
    Stopped { cycles: u32, elapsed: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum AlertKind {
    OverrideActivated,
    CriticalBattery,
    HighConsumption,
    ApplianceSwitched,
    Started,
    Stopped,
}

//Alerts with the same key announce the same thing. ON and OFF switches are different keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub kind: AlertKind,
    pub switched_on: Option<bool>,
}

impl AlertKind {
    //State transitions fire on first occurrence regardless of other recent alerts
    pub fn is_transition(&self) -> bool {
        matches!(self, AlertKind::OverrideActivated | AlertKind::ApplianceSwitched)
    }

    pub fn is_lifecycle(&self) -> bool {
        matches!(self, AlertKind::Started | AlertKind::Stopped)
    }
}

impl Alert {
    pub fn kind(&self) -> AlertKind {
        match self {
            Alert::OverrideActivated { .. } => AlertKind::OverrideActivated,
            Alert::CriticalBattery { .. } => AlertKind::CriticalBattery,
            Alert::HighConsumption { .. } => AlertKind::HighConsumption,
            Alert::ApplianceSwitched { .. } => AlertKind::ApplianceSwitched,
            Alert::Started { .. } => AlertKind::Started,
            Alert::Stopped { .. } => AlertKind::Stopped,
        }
    }

    pub fn key(&self) -> AlertKey {
        let switched_on = match self {
            Alert::ApplianceSwitched { on } => Some(*on),
            _ => None,
        };

        AlertKey {
            kind: self.kind(),
            switched_on,
        }
    }
}

impl Display for Alert {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alert::OverrideActivated {
                state_of_charge,
                watts_out,
            } => write!(
                f,
                "Override active: appliance forced ON (battery {}, output {})",
                state_of_charge, watts_out
            ),
            Alert::CriticalBattery { state_of_charge } => {
                write!(f, "Critical battery level: {}", state_of_charge)
            }
            Alert::HighConsumption { watts_out } => write!(f, "High power consumption: {}", watts_out),
            Alert::ApplianceSwitched { on } => {
                write!(f, "Appliance switched {}", if *on { "ON" } else { "OFF" })
            }
            Alert::Started { appliance_on } => write!(
                f,
                "Power station control started, appliance is {}",
                if *appliance_on { "ON" } else { "OFF" }
            ),
            Alert::Stopped { cycles, elapsed } => write!(
                f,
                "Power station control stopped after {} cycles ({})",
                cycles,
                elapsed.to_human_readable()
            ),
        }
    }
}
