use crate::core::Telemetry;
use crate::core::time::DateTime;

use super::{Alert, ControlConfig, ControlState};

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub appliance_on: bool,
    pub override_active: bool,
    pub alerts: Vec<Alert>,
}

//Pure: the caller applies `override_active` to its state and actuates the appliance
pub fn decide(telemetry: &Telemetry, now: DateTime, state: &ControlState, config: &ControlConfig) -> Decision {
    let in_window = config.schedule().contains(now.time());
    let battery_low = telemetry.state_of_charge < config.battery_threshold;
    let power_low = telemetry.watts_out < config.power_threshold;

    let mut alerts = vec![];

    let (appliance_on, override_active) = if in_window {
        if battery_low || power_low {
            if !state.override_active {
                alerts.push(Alert::OverrideActivated {
                    state_of_charge: telemetry.state_of_charge,
                    watts_out: telemetry.watts_out,
                });
            }
            (true, true)
        } else {
            (false, false)
        }
    } else {
        //outside the controlled window the appliance always runs
        (true, false)
    };

    if telemetry.state_of_charge < config.critical_battery {
        alerts.push(Alert::CriticalBattery {
            state_of_charge: telemetry.state_of_charge,
        });
    }

    if telemetry.watts_out > config.high_consumption {
        alerts.push(Alert::HighConsumption {
            watts_out: telemetry.watts_out,
        });
    }

    tracing::debug!(
        in_window,
        battery_low,
        power_low,
        appliance_on,
        override_active,
        "Decided appliance state for {} at {}",
        telemetry.device_id,
        now
    );

    Decision {
        appliance_on,
        override_active,
        alerts,
    }
}
