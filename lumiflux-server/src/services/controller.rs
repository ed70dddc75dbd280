use std::sync::Arc;

use lumiflux_api::{ApplyResponse, AutoControlStatus, DeviceId, DisableResponse, FleetSnapshot};
use tokio::sync::RwLock;

use crate::configs::Settings;
use crate::errors::ControlError;
use crate::services::applier::{Applied, Percent, PercentageApplier};
use crate::services::notifier::Notifier;
use crate::services::registry::DeviceRegistry;
use crate::services::scheduler::{AutoControl, AutoControlSession};
use crate::services::threshold_source::ThresholdSource;
use crate::services::transport::RegisterTransport;

impl From<Applied> for ApplyResponse {
    fn from(applied: Applied) -> Self {
        Self {
            device_id: applied.device_id,
            applied_percent: applied.percent,
            power_watts: applied.power_watts,
        }
    }
}

/// The control surface offered to the HTTP layer and to shutdown handling.
///
/// Foreground commands run on the caller's task and share the applier, and
/// with it the transaction lock, with the background loop.
pub struct Controller {
    registry: Arc<DeviceRegistry>,
    applier: Arc<PercentageApplier>,
    auto_control: AutoControlSession,
    selected: RwLock<Option<DeviceId>>,
}

impl Controller {
    pub fn new(
        settings: Arc<Settings>,
        transport: Box<dyn RegisterTransport>,
        source: Arc<dyn ThresholdSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let registry = Arc::new(DeviceRegistry::new(&settings.devices));
        let applier = Arc::new(PercentageApplier::new(
            registry.clone(),
            transport,
            settings.transport.default_max_flux,
            settings.transaction_timeout(),
        ));
        let auto_control = AutoControlSession::new(AutoControl::new(
            settings,
            registry.clone(),
            applier.clone(),
            source,
            notifier,
        ));

        Self {
            registry,
            applier,
            auto_control,
            selected: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    pub async fn select_device(&self, id: DeviceId) -> Result<(), ControlError> {
        if !self.registry.contains(id) {
            return Err(ControlError::UnknownDevice(id));
        }

        *self.selected.write().await = Some(id);
        tracing::debug!("Device {} selected", id);

        Ok(())
    }

    pub async fn selected_device(&self) -> Option<DeviceId> {
        *self.selected.read().await
    }

    pub async fn apply_selected(&self, percent: i64) -> Result<Applied, ControlError> {
        let id = self
            .selected_device()
            .await
            .ok_or(ControlError::NoDeviceSelected)?;

        self.apply_percent(id, percent).await
    }

    pub async fn apply_percent(&self, id: DeviceId, percent: i64) -> Result<Applied, ControlError> {
        let percent = Percent::new(percent)?;

        self.applier.apply(id, percent).await
    }

    /// Walks devices by ascending id and stops at the first failing one;
    /// lower ids keep their new value and higher ids are not touched.
    pub async fn apply_percent_all(&self, percent: i64) -> Result<Vec<Applied>, ControlError> {
        let percent = Percent::new(percent)?;

        let mut applied = Vec::with_capacity(self.registry.ids_by_id().len());
        for &id in self.registry.ids_by_id() {
            match self.applier.apply(id, percent).await {
                Ok(result) => {
                    tracing::info!("Set {}% to device {}", percent.value(), id);
                    applied.push(result);
                }
                Err(e) => {
                    return Err(ControlError::ApplyAll {
                        device: id,
                        source: Box::new(e),
                    });
                }
            }
        }

        Ok(applied)
    }

    pub async fn disable_device(&self, id: DeviceId) -> Result<(), ControlError> {
        self.applier.disable(id).await
    }

    /// Attempts every device and records failures instead of returning them.
    pub async fn disable_all(&self) -> DisableResponse {
        let mut report = DisableResponse {
            disabled: Vec::new(),
            failed: Vec::new(),
        };

        for &id in self.registry.ids_by_id() {
            match self.applier.disable(id).await {
                Ok(()) => report.disabled.push(id),
                Err(e) => {
                    tracing::error!("Failed to disable device {}: {}", id, e);
                    report.failed.push(id);
                }
            }
        }

        report
    }

    /// Reads max flux from the selected device, or the first configured one.
    pub async fn calibrate(&self) -> Result<u16, ControlError> {
        let id = match self.selected_device().await {
            Some(id) => id,
            None => *self
                .registry
                .ids()
                .first()
                .ok_or(ControlError::NoDeviceSelected)?,
        };

        self.applier.calibrate(id).await
    }

    pub async fn arm_auto_control(&self) -> bool {
        self.auto_control.arm().await
    }

    pub fn disarm_auto_control(&self) -> bool {
        self.auto_control.disarm()
    }

    pub async fn wait_auto_control_stopped(&self) {
        self.auto_control.wait_stopped().await
    }

    pub fn auto_control_status(&self) -> AutoControlStatus {
        self.auto_control.status()
    }

    pub async fn snapshot(&self) -> FleetSnapshot {
        let selected = self.selected_device().await;

        FleetSnapshot {
            devices: self
                .registry
                .ordered()
                .await
                .iter()
                .map(|device| device.snapshot(selected == Some(device.id)))
                .collect(),
            max_flux: self.applier.max_flux(),
            auto_control: self.auto_control.status(),
        }
    }

    /// Stops the loop, switches every device off and closes the connection.
    pub async fn shutdown(&self) -> DisableResponse {
        self.auto_control.disarm();
        self.auto_control.wait_stopped().await;

        let report = self.disable_all().await;
        self.applier.close().await;

        report
    }
}
