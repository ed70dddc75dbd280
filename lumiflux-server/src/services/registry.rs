use std::collections::BTreeMap;

use lumiflux_api::{DeviceId, DeviceSnapshot, UnitId};
use tokio::sync::RwLock;

use crate::configs::DeviceEntry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub id: DeviceId,
    pub address: UnitId,
    pub name: String,
    /// Row of the external threshold table for this device
    pub row: u32,
    pub enabled: bool,
    pub last_percent: Option<u8>,
    pub last_power_watts: Option<u32>,
    pub healthy: bool,
}

impl Device {
    fn from_entry(entry: &DeviceEntry) -> Self {
        Self {
            id: entry.id,
            address: entry.address,
            name: entry.name.clone(),
            row: entry.row,
            enabled: false,
            last_percent: None,
            last_power_watts: None,
            healthy: true,
        }
    }

    pub fn snapshot(&self, selected: bool) -> DeviceSnapshot {
        DeviceSnapshot {
            id: self.id,
            address: self.address,
            name: self.name.clone(),
            enabled: self.enabled,
            healthy: self.healthy,
            last_percent: self.last_percent,
            last_power_watts: self.last_power_watts,
            selected,
        }
    }
}

/// Canonical per-device state, keyed by logical id.
///
/// Display order is kept separately and only serves presentation; lookups
/// always go through the id.
pub struct DeviceRegistry {
    devices: RwLock<BTreeMap<DeviceId, Device>>,
    display_order: Vec<DeviceId>,
    by_id: Vec<DeviceId>,
}

impl DeviceRegistry {
    /// Expects entries already validated for unique ids and addresses.
    pub fn new(entries: &[DeviceEntry]) -> Self {
        let devices = entries
            .iter()
            .map(|entry| (entry.id, Device::from_entry(entry)))
            .collect();

        let display_order: Vec<DeviceId> = entries.iter().map(|entry| entry.id).collect();
        let mut by_id = display_order.clone();
        by_id.sort_unstable();

        Self {
            devices: RwLock::new(devices),
            display_order,
            by_id,
        }
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.display_order.contains(&id)
    }

    /// Ids in configured display order.
    pub fn ids(&self) -> &[DeviceId] {
        &self.display_order
    }

    /// Ids in ascending order, the order fleet-wide commands walk.
    pub fn ids_by_id(&self) -> &[DeviceId] {
        &self.by_id
    }

    pub async fn get(&self, id: DeviceId) -> Option<Device> {
        self.devices.read().await.get(&id).cloned()
    }

    pub async fn set_enabled(&self, id: DeviceId, enabled: bool) {
        self.update(id, |device| device.enabled = enabled).await;
    }

    pub async fn set_last_percent(&self, id: DeviceId, percent: u8) {
        self.update(id, |device| device.last_percent = Some(percent)).await;
    }

    pub async fn set_last_power(&self, id: DeviceId, watts: Option<u32>) {
        self.update(id, |device| device.last_power_watts = watts).await;
    }

    pub async fn set_healthy(&self, id: DeviceId, healthy: bool) {
        self.update(id, |device| device.healthy = healthy).await;
    }

    /// Devices in configured display order.
    pub async fn ordered(&self) -> Vec<Device> {
        let devices = self.devices.read().await;

        self.display_order
            .iter()
            .filter_map(|id| devices.get(id).cloned())
            .collect()
    }

    async fn update(&self, id: DeviceId, apply: impl FnOnce(&mut Device)) {
        if let Some(device) = self.devices.write().await.get_mut(&id) {
            apply(device);
        } else {
            tracing::warn!("Ignoring update for unregistered device {}", id);
        }
    }
}
