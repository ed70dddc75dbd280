use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use lumiflux_analyser::{combine_power, percent_to_flux};
use lumiflux_api::DeviceId;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::errors::{ConfigError, ControlError, Step, TransportError};
use crate::services::registry::{Device, DeviceRegistry};
use crate::services::transport::{
    ENABLE_REGISTER, MAX_FLUX_REGISTER, POWER_REGISTER, RegisterTransport, SETPOINT_REGISTER,
};

/// A brightness percentage known to lie in 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Percent(u8);

impl Percent {
    pub fn new(value: i64) -> Result<Self, ConfigError> {
        match u8::try_from(value) {
            Ok(percent) if percent <= 100 => Ok(Self(percent)),
            _ => Err(ConfigError::PercentOutOfRange(value)),
        }
    }

    /// Rounds a computed target to the nearest whole percent.
    pub fn from_target(target: f64) -> Result<Self, ConfigError> {
        Self::new(target.round() as i64)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    pub device_id: DeviceId,
    pub percent: u8,
    pub power_watts: Option<u32>,
}

/// Runs the enable, set and read-back sequence for one device at a time.
///
/// The transport sits behind a single lock held for a whole sequence, so two
/// callers never interleave their steps on the shared connection.
pub struct PercentageApplier {
    registry: Arc<DeviceRegistry>,
    transport: Mutex<Box<dyn RegisterTransport>>,
    max_flux: AtomicU16,
    timeout: Duration,
}

impl PercentageApplier {
    pub fn new(
        registry: Arc<DeviceRegistry>,
        transport: Box<dyn RegisterTransport>,
        max_flux: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            transport: Mutex::new(transport),
            max_flux: AtomicU16::new(max_flux),
            timeout,
        }
    }

    pub fn max_flux(&self) -> u16 {
        self.max_flux.load(Ordering::Relaxed)
    }

    pub async fn apply(&self, id: DeviceId, percent: Percent) -> Result<Applied, ControlError> {
        let device = self.device(id).await?;
        let mut transport = self.transport.lock().await;

        self.open(&mut **transport, &device).await?;

        let enable = self
            .bounded(transport.write_registers(ENABLE_REGISTER, &[1], device.address))
            .await;
        self.step(&mut **transport, &device, Step::Enable, enable).await?;
        self.registry.set_enabled(id, true).await;

        let flux = percent_to_flux(percent.value(), self.max_flux());
        let set = self
            .bounded(transport.write_registers(SETPOINT_REGISTER, &[flux], device.address))
            .await;
        self.step(&mut **transport, &device, Step::Set, set).await?;

        tracing::debug!(
            "Device {} (unit {}) set to {}% (flux {})",
            id,
            device.address,
            percent.value(),
            flux
        );

        let power_watts = match self
            .bounded(transport.read_registers(POWER_REGISTER, 2, device.address))
            .await
            .and_then(|values| match values.as_slice() {
                [high, low, ..] => Ok(combine_power(*high, *low)),
                _ => Err(TransportError::ShortRead { expected: 2, received: values.len() }),
            }) {
            Ok(watts) => Some(watts),
            Err(e) => {
                tracing::warn!("The {} transaction failed on device {}: {}", Step::ReadBack, id, e);
                self.recover(&mut **transport, &e).await;
                None
            }
        };

        self.registry.set_last_percent(id, percent.value()).await;
        self.registry.set_last_power(id, power_watts).await;
        self.registry.set_healthy(id, true).await;

        Ok(Applied {
            device_id: id,
            percent: percent.value(),
            power_watts,
        })
    }

    pub async fn disable(&self, id: DeviceId) -> Result<(), ControlError> {
        let device = self.device(id).await?;
        let mut transport = self.transport.lock().await;

        self.open(&mut **transport, &device).await?;

        let disable = self
            .bounded(transport.write_registers(ENABLE_REGISTER, &[0], device.address))
            .await;
        self.step(&mut **transport, &device, Step::Disable, disable).await?;

        self.registry.set_enabled(id, false).await;
        self.registry.set_healthy(id, true).await;

        tracing::debug!("Device {} (unit {}) disabled", id, device.address);

        Ok(())
    }

    /// Reads the max flux register from a device and adopts it. The previous
    /// value stays in effect if the read fails.
    pub async fn calibrate(&self, id: DeviceId) -> Result<u16, ControlError> {
        let device = self.device(id).await?;
        let mut transport = self.transport.lock().await;

        self.open(&mut **transport, &device).await?;

        let read = self
            .bounded(transport.read_registers(MAX_FLUX_REGISTER, 1, device.address))
            .await
            .and_then(|values| {
                values
                    .first()
                    .copied()
                    .ok_or(TransportError::ShortRead { expected: 1, received: 0 })
            });
        let max_flux = self.step(&mut **transport, &device, Step::Calibrate, read).await?;

        self.max_flux.store(max_flux, Ordering::Relaxed);

        tracing::info!("Calibrated max flux to {} from device {}", max_flux, id);

        Ok(max_flux)
    }

    pub async fn close(&self) {
        self.transport.lock().await.close().await;
    }

    async fn device(&self, id: DeviceId) -> Result<Device, ControlError> {
        self.registry
            .get(id)
            .await
            .ok_or(ControlError::UnknownDevice(id))
    }

    async fn open(
        &self,
        transport: &mut dyn RegisterTransport,
        device: &Device,
    ) -> Result<(), ControlError> {
        if let Err(source) = self.bounded(transport.connect()).await {
            self.recover(transport, &source).await;
            self.registry.set_healthy(device.id, false).await;
            return Err(ControlError::Transport {
                device: device.id,
                source,
            });
        }

        Ok(())
    }

    async fn step<T>(
        &self,
        transport: &mut dyn RegisterTransport,
        device: &Device,
        step: Step,
        result: Result<T, TransportError>,
    ) -> Result<T, ControlError> {
        match result {
            Ok(value) => Ok(value),
            Err(source) => {
                self.recover(transport, &source).await;
                self.registry.set_healthy(device.id, false).await;
                Err(ControlError::Transaction {
                    device: device.id,
                    step,
                    source,
                })
            }
        }
    }

    /// A timed-out request may still be answered later, so the connection is
    /// not reused after one.
    async fn recover(&self, transport: &mut dyn RegisterTransport, error: &TransportError) {
        if matches!(error, TransportError::Timeout(_)) {
            transport.close().await;
        }
    }

    async fn bounded<T>(
        &self,
        operation: impl Future<Output = Result<T, TransportError>>,
    ) -> Result<T, TransportError> {
        timeout(self.timeout, operation)
            .await
            .unwrap_or(Err(TransportError::Timeout(self.timeout)))
    }
}
