use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;

use crate::core::Appliance;
use crate::error::DeviceError;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Simulated {
    #[serde(default)]
    pub initially_on: bool,
}

impl Simulated {
    pub fn new_appliance(&self) -> SimulatedAppliance {
        SimulatedAppliance {
            on: Arc::new(AtomicBool::new(self.initially_on)),
        }
    }
}

//Dry-run stand-in when no real outlet is configured
#[derive(Debug, Clone)]
pub struct SimulatedAppliance {
    on: Arc<AtomicBool>,
}

impl Appliance for SimulatedAppliance {
    async fn get_state(&self) -> Result<bool, DeviceError> {
        Ok(self.on.load(Ordering::SeqCst))
    }

    async fn set_state(&self, on: bool) -> Result<bool, DeviceError> {
        tracing::info!("Simulated appliance switched {}", if on { "ON" } else { "OFF" });
        self.on.store(on, Ordering::SeqCst);
        Ok(on)
    }
}
