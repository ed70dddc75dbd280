use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use lumiflux_analyser::DEFAULT_MAX_FLUX;
use lumiflux_api::{DeviceId, UnitId};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Number of ascending boundaries in a threshold row.
pub const LIMIT_COLUMNS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transport {
    pub host: String,
    #[serde(default = "default_transport_port")]
    pub port: u16,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_flux")]
    pub default_max_flux: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

/// Where each value lives in the external threshold table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layout {
    pub import_value: CellRef,
    pub import_limit: CellRef,
    pub export_value: CellRef,
    pub export_limit: CellRef,
    pub par_column: u32,
    pub limit_columns: Vec<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scheduler {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_overload_scale")]
    pub overload_scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notifier {
    pub webhook_url: Option<String>,
    pub destination: String,
    #[serde(default = "default_alert_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEntry {
    pub id: DeviceId,
    pub address: UnitId,
    pub name: String,
    /// Row of the external table holding this device's thresholds
    pub row: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub logger: Logger,
    pub transport: Transport,
    pub source: Source,
    pub layout: Layout,
    pub scheduler: Scheduler,
    pub notifier: Notifier,
    pub devices: Vec<DeviceEntry>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or("development".into());

        let settings: Settings = Config::builder()
            .add_source(File::with_name("configs/default"))
            .add_source(File::with_name(&format!("configs/{run_mode}")).required(false))
            .add_source(
                Environment::with_prefix("LUMIFLUX")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;

        Ok(settings)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        settings.validate()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(ConfigError::NoDevices);
        }

        let mut ids = BTreeSet::new();
        let mut addresses: BTreeMap<UnitId, DeviceId> = BTreeMap::new();
        for device in &self.devices {
            if !ids.insert(device.id) {
                return Err(ConfigError::DuplicateDevice(device.id));
            }
            if device.address == 0 {
                return Err(ConfigError::InvalidSetting {
                    key: "devices.address",
                    reason: format!("device {} uses the broadcast address 0", device.id),
                });
            }
            if let Some(first) = addresses.insert(device.address, device.id) {
                return Err(ConfigError::DuplicateAddress {
                    address: device.address,
                    first,
                    second: device.id,
                });
            }
        }

        if self.layout.limit_columns.len() != LIMIT_COLUMNS {
            return Err(ConfigError::LimitColumns {
                expected: LIMIT_COLUMNS,
                found: self.layout.limit_columns.len(),
            });
        }

        if self.scheduler.interval_secs == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "scheduler.interval_secs",
                reason: "must be at least one second".into(),
            });
        }

        let scale = self.scheduler.overload_scale;
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(ConfigError::InvalidSetting {
                key: "scheduler.overload_scale",
                reason: format!("{scale} is outside (0, 1]"),
            });
        }

        if self.transport.timeout_ms == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "transport.timeout_ms",
                reason: "a transaction needs a bounded, non-zero timeout".into(),
            });
        }

        if self.notifier.timeout_ms == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "notifier.timeout_ms",
                reason: "alert delivery needs a non-zero timeout".into(),
            });
        }

        Ok(())
    }

    pub fn transaction_timeout(&self) -> Duration {
        Duration::from_millis(self.transport.timeout_ms)
    }

    pub fn alert_timeout(&self) -> Duration {
        Duration::from_millis(self.notifier.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.interval_secs)
    }
}

fn default_transport_port() -> u16 {
    502
}

fn default_timeout_ms() -> u64 {
    3000
}

fn default_alert_timeout_ms() -> u64 {
    10_000
}

fn default_max_flux() -> u16 {
    DEFAULT_MAX_FLUX
}

fn default_interval_secs() -> u64 {
    300
}

fn default_overload_scale() -> f64 {
    0.9
}
