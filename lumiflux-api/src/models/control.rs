use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::DeviceId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRequest {
    /// Device to select
    pub device_id: DeviceId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyRequest {
    /// Brightness percentage, validated server side to 0-100
    pub percent: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResponse {
    /// Device the brightness was applied to
    pub device_id: DeviceId,
    /// Percentage written to the device
    pub applied_percent: u8,
    /// Power read back after the write, if the read succeeded
    pub power_watts: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetApplyResponse {
    /// Per-device results in display order
    pub devices: Vec<ApplyResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisableResponse {
    /// Devices that were disabled
    pub disabled: Vec<DeviceId>,
    /// Devices whose disable command failed
    pub failed: Vec<DeviceId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoControlStatus {
    /// Whether the control loop is armed
    pub armed: bool,
    /// Number of arm events
    pub executions: u64,
    /// Number of completed passes over the fleet
    pub iteration_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResponse {
    /// Raw setpoint corresponding to full brightness
    pub max_flux: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// Operation result message
    pub message: String,
}
