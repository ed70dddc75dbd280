use std::fmt;

use axum::http::StatusCode;
use lumiflux_api::DeviceId;

use super::{ConfigError, SourceError, TransportError};

/// One register operation within a transaction sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Enable,
    Set,
    ReadBack,
    Disable,
    Calibrate,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Step::Enable => write!(f, "enable"),
            Step::Set => write!(f, "set"),
            Step::ReadBack => write!(f, "read-back"),
            Step::Disable => write!(f, "disable"),
            Step::Calibrate => write!(f, "calibrate"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("Device {0} is not registered")]
    UnknownDevice(DeviceId),

    #[error("No device selected")]
    NoDeviceSelected,

    #[error("Transport unavailable for device {device}: {source}")]
    Transport {
        device: DeviceId,
        #[source]
        source: TransportError,
    },

    #[error("The {step} transaction failed on device {device}: {source}")]
    Transaction {
        device: DeviceId,
        step: Step,
        #[source]
        source: TransportError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Apply to all stopped at device {device}: {source}")]
    ApplyAll {
        device: DeviceId,
        #[source]
        source: Box<ControlError>,
    },
}

impl ControlError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ControlError::UnknownDevice(_) => StatusCode::NOT_FOUND,
            ControlError::NoDeviceSelected => StatusCode::CONFLICT,
            ControlError::Transport { .. } => StatusCode::BAD_GATEWAY,
            ControlError::Transaction { .. } => StatusCode::BAD_GATEWAY,
            ControlError::Config(e) => e.status_code(),
            ControlError::Source(_) => StatusCode::BAD_GATEWAY,
            ControlError::ApplyAll { source, .. } => source.status_code(),
        }
    }

    /// Device the failure is attributed to, if any.
    pub fn device(&self) -> Option<DeviceId> {
        match self {
            ControlError::UnknownDevice(device)
            | ControlError::Transport { device, .. }
            | ControlError::Transaction { device, .. }
            | ControlError::ApplyAll { device, .. } => Some(*device),
            _ => None,
        }
    }
}
