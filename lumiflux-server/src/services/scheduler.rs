use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lumiflux_analyser::{OverloadReading, ThresholdTable};
use lumiflux_api::{AutoControlStatus, DeviceId};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::configs::Settings;
use crate::errors::{ConfigError, ControlError};
use crate::services::applier::{Applied, Percent, PercentageApplier};
use crate::services::notifier::Notifier;
use crate::services::registry::DeviceRegistry;
use crate::services::threshold_source::{IterationCells, ThresholdRow, ThresholdSource};

#[derive(Debug, Default)]
pub struct PassReport {
    pub overloaded: bool,
    pub applied: Vec<Applied>,
    pub failed: Vec<DeviceId>,
}

/// Everything one pass over the fleet needs.
pub struct AutoControl {
    settings: Arc<Settings>,
    registry: Arc<DeviceRegistry>,
    applier: Arc<PercentageApplier>,
    source: Arc<dyn ThresholdSource>,
    notifier: Arc<dyn Notifier>,
    iterations: AtomicU64,
}

impl AutoControl {
    pub fn new(
        settings: Arc<Settings>,
        registry: Arc<DeviceRegistry>,
        applier: Arc<PercentageApplier>,
        source: Arc<dyn ThresholdSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            settings,
            registry,
            applier,
            source,
            notifier,
            iterations: AtomicU64::new(0),
        }
    }

    pub fn iteration_count(&self) -> u64 {
        self.iterations.load(Ordering::SeqCst)
    }

    /// Fetches every threshold the pass needs before touching any device, so
    /// a source failure leaves the whole fleet as it was.
    pub async fn run_iteration(&self) -> Result<PassReport, ControlError> {
        let layout = &self.settings.layout;
        let mut cells = IterationCells::new(self.source.as_ref());

        let reading = cells.overload(layout).await?;
        let overloaded = reading.is_overloaded();
        if overloaded {
            self.alert(&reading);
        }

        let mut targets = Vec::with_capacity(self.registry.ids().len());
        for device in self.registry.ordered().await {
            let row = cells.threshold_row(layout, device.row).await?;
            targets.push((device.id, row));
        }
        drop(cells);

        let mut report = PassReport {
            overloaded,
            ..Default::default()
        };

        for (id, row) in targets {
            let percent = match self.target(id, &row, overloaded) {
                Ok(percent) => percent,
                Err(e) => {
                    error!("Skipping device {} this pass: {}", id, e);
                    report.failed.push(id);
                    continue;
                }
            };

            match self.applier.apply(id, percent).await {
                Ok(applied) => report.applied.push(applied),
                Err(e) => {
                    error!("Auto control could not apply {}% to device {}: {}", percent.value(), id, e);
                    report.failed.push(id);
                }
            }
        }

        Ok(report)
    }

    fn target(&self, id: DeviceId, row: &ThresholdRow, overloaded: bool) -> Result<Percent, ConfigError> {
        let thresholds = |source| ConfigError::Thresholds { device: id, source };

        let table = ThresholdTable::new(row.limits).map_err(thresholds)?;
        let mut percent = table.percent_for(row.par_value).map_err(thresholds)?;

        if overloaded {
            percent *= self.settings.scheduler.overload_scale;
        }

        Percent::from_target(percent)
    }

    fn alert(&self, reading: &OverloadReading) {
        let message = format!(
            "Overload detected: import {} (limit {}), export {} (limit {}). Dimming fleet to {}% of target.",
            reading.import_value,
            reading.import_limit,
            reading.export_value,
            reading.export_limit,
            self.settings.scheduler.overload_scale * 100.0
        );
        warn!("{}", message);

        let notifier = self.notifier.clone();
        let destination = self.settings.notifier.destination.clone();

        tokio::spawn(async move {
            if let Err(e) = notifier.send_alert(&destination, &message).await {
                warn!("Failed to deliver overload alert: {}", e);
            }
        });
    }

    /// Runs passes for as long as `execution` is the armed one. A newer arm,
    /// a disarm or a dropped session ends the loop after the current pass.
    pub async fn run(self: Arc<Self>, mut armed: watch::Receiver<u64>, execution: u64) {
        info!("Auto control loop {} started", execution);

        while still_armed(&mut armed, execution) {
            match self.run_iteration().await {
                Ok(report) => {
                    let count = self.iterations.fetch_add(1, Ordering::SeqCst) + 1;
                    info!(
                        overloaded = report.overloaded,
                        "Auto control pass {} finished: {} applied, {} failed",
                        count,
                        report.applied.len(),
                        report.failed.len()
                    );
                }
                Err(e) => error!("Auto control iteration aborted: {}", e),
            }

            if !still_armed(&mut armed, execution) {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval()) => {}
                _ = superseded(&mut armed, execution) => {}
            }
        }

        info!("Auto control loop {} stopped", execution);
    }
}

fn still_armed(armed: &mut watch::Receiver<u64>, execution: u64) -> bool {
    armed.has_changed().is_ok() && *armed.borrow_and_update() == execution
}

/// Resolves once `execution` is no longer the armed one, or the session is
/// gone.
async fn superseded(armed: &mut watch::Receiver<u64>, execution: u64) {
    while *armed.borrow_and_update() == execution {
        if armed.changed().await.is_err() {
            return;
        }
    }
}

/// Process-wide arm/disarm state around the single control loop task.
///
/// The channel carries the armed execution number, or 0 when disarmed.
/// Disarming is cooperative: the loop finishes the pass in progress, then
/// exits without sleeping.
pub struct AutoControlSession {
    control: Arc<AutoControl>,
    armed: watch::Sender<u64>,
    executions: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AutoControlSession {
    pub fn new(control: AutoControl) -> Self {
        let (armed, _) = watch::channel(0);

        Self {
            control: Arc::new(control),
            armed,
            executions: AtomicU64::new(0),
            task: Mutex::new(None),
        }
    }

    /// Starts the loop and returns immediately. Returns `false` when the loop
    /// is already running.
    pub async fn arm(&self) -> bool {
        let mut task = self.task.lock().await;

        let running = task.as_ref().is_some_and(|task| !task.is_finished());
        if running && self.is_armed() {
            return false;
        }

        let execution = self.executions.fetch_add(1, Ordering::SeqCst) + 1;
        self.armed.send_replace(execution);

        let control = self.control.clone();
        let armed = self.armed.subscribe();
        let previous = task.take();

        *task = Some(tokio::spawn(async move {
            // A disarmed loop may still be finishing its last pass.
            if let Some(previous) = previous {
                if let Err(e) = previous.await {
                    error!("Previous auto control loop ended abnormally: {}", e);
                }
            }

            control.run(armed, execution).await
        }));

        info!("Auto control armed (execution {})", execution);

        true
    }

    /// Returns `false` when the loop was not armed.
    pub fn disarm(&self) -> bool {
        let was_armed = self.armed.send_replace(0) != 0;
        if was_armed {
            info!("Auto control disarmed, stopping after the current pass");
        }
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        *self.armed.borrow() != 0
    }

    /// Waits for a disarmed loop, and any loop it was queued behind, to exit.
    pub async fn wait_stopped(&self) {
        let task = self.task.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Auto control loop ended abnormally: {}", e);
            }
        }
    }

    pub fn status(&self) -> AutoControlStatus {
        AutoControlStatus {
            armed: self.is_armed(),
            executions: self.executions.load(Ordering::SeqCst),
            iteration_count: self.control.iteration_count(),
        }
    }
}
