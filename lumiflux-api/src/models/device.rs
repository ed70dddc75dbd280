use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::{AutoControlStatus, DeviceId, UnitId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    /// Logical device identifier
    pub id: DeviceId,
    /// Unit address on the register transport
    pub address: UnitId,
    /// Display name
    pub name: String,
    /// Whether the last enable command succeeded
    pub enabled: bool,
    /// Cleared after a failed transaction, restored on the next success
    pub healthy: bool,
    /// Last brightness commanded successfully
    pub last_percent: Option<u8>,
    /// Last power read back from the device
    pub last_power_watts: Option<u32>,
    /// Whether the device is the current selection
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetSnapshot {
    /// Devices in display order
    pub devices: Vec<DeviceSnapshot>,
    /// Raw setpoint corresponding to full brightness
    pub max_flux: u16,
    /// Auto-control session state
    pub auto_control: AutoControlStatus,
}

impl FleetSnapshot {
    pub fn device(&self, id: DeviceId) -> Option<&DeviceSnapshot> {
        self.devices.iter().find(|device| device.id == id)
    }
}
