use axum::http::StatusCode;
use lumiflux_analyser::InterpolateError;
use lumiflux_api::{DeviceId, UnitId};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Percentage {0} is outside 0-100")]
    PercentOutOfRange(i64),

    #[error("Threshold table for device {device} is invalid: {source}")]
    Thresholds {
        device: DeviceId,
        #[source]
        source: InterpolateError,
    },

    #[error("Expected {expected} threshold limit columns, found {found}")]
    LimitColumns { expected: usize, found: usize },

    #[error("Device id {0} is configured more than once")]
    DuplicateDevice(DeviceId),

    #[error("Unit address {address} is shared by devices {first} and {second}")]
    DuplicateAddress {
        address: UnitId,
        first: DeviceId,
        second: DeviceId,
    },

    #[error("No devices configured")]
    NoDevices,

    #[error("Invalid setting `{key}`: {reason}")]
    InvalidSetting { key: &'static str, reason: String },

    #[error("Failed to load settings: {0}")]
    Load(#[from] ::config::ConfigError),
}

impl ConfigError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConfigError::PercentOutOfRange(_) | ConfigError::Thresholds { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
