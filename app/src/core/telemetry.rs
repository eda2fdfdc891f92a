use serde::Serialize;

use super::time::DateTime;
use super::unit::{DegreeCelsius, Percent, Watt};

//Only built from a fully parsed vendor response. There is no Default on purpose,
//a zero-filled reading must never reach the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Telemetry {
    pub state_of_charge: Percent,
    pub watts_in: Watt,
    pub watts_out: Watt,
    pub battery_temp_c: DegreeCelsius,
    pub remaining_minutes: f64,
    pub device_id: String,
    pub observed_at: DateTime,
}

impl Telemetry {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

//seconds to minutes, one decimal
pub fn remaining_minutes(remaining_seconds: f64) -> f64 {
    (remaining_seconds / 60.0 * 10.0).round() / 10.0
}

#[cfg(test)]
pub mod fixture {
    use super::*;

    pub fn telemetry(state_of_charge: f64, watts_out: f64) -> Telemetry {
        Telemetry {
            state_of_charge: Percent(state_of_charge),
            watts_in: Watt(120.0),
            watts_out: Watt(watts_out),
            battery_temp_c: DegreeCelsius(24.0),
            remaining_minutes: 95.5,
            device_id: "R611ZAB6XG7J1240".to_owned(),
            observed_at: DateTime::from_iso("2025-06-01T10:00:00+02:00").unwrap(),
        }
    }
}
