#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use lumiflux_api::UnitId;
use lumiflux_server::app::create_app;
use lumiflux_server::configs::Settings;
use lumiflux_server::errors::{NotifyError, SourceError, TransportError};
use lumiflux_server::services::{
    AutoControl, CellValue, Controller, DeviceRegistry, Notifier, PercentageApplier, RegisterTransport,
    ThresholdSource,
};
use tokio::sync::oneshot;

pub const SETTINGS: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 0

    [logger]
    level = "debug"

    [transport]
    host = "127.0.0.1"
    timeout_ms = 200

    [source]
    url = "http://127.0.0.1:9/sheet"

    [layout]
    import_value = { row = 1, col = 2 }
    import_limit = { row = 1, col = 3 }
    export_value = { row = 2, col = 2 }
    export_limit = { row = 2, col = 3 }
    par_column = 2
    limit_columns = [3, 4, 5, 6, 7]

    [scheduler]
    interval_secs = 300

    [notifier]
    destination = "operators"
"#;

/// Three devices whose display order differs from their unit addresses:
/// device 1 is unit 3, device 2 is unit 1, device 3 is unit 2.
pub const DEVICES: &str = r#"
    [[devices]]
    id = 1
    address = 3
    name = "place 1"
    row = 4

    [[devices]]
    id = 2
    address = 1
    name = "place 2"
    row = 5

    [[devices]]
    id = 3
    address = 2
    name = "place 3"
    row = 6
"#;

pub const LIMITS: [f64; 5] = [100.0, 200.0, 300.0, 400.0, 500.0];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write {
    pub unit: UnitId,
    pub address: u16,
    pub values: Vec<u16>,
}

struct Pause {
    unit: UnitId,
    address: u16,
    reached: oneshot::Sender<()>,
    resume: oneshot::Receiver<()>,
}

#[derive(Default)]
struct Bus {
    registers: HashMap<(UnitId, u16), u16>,
    failing: HashSet<(UnitId, u16)>,
    stalled: HashSet<(UnitId, u16)>,
    refuse_connect: bool,
    writes: Vec<Write>,
    pause: Option<Pause>,
}

/// In-memory register map shared between a test and the transport it hands
/// to the controller.
#[derive(Clone, Default)]
pub struct FakeBus(Arc<Mutex<Bus>>);

impl FakeBus {
    pub fn transport(&self) -> Box<dyn RegisterTransport> {
        Box::new(FakeTransport {
            bus: self.clone(),
            connected: false,
        })
    }

    pub fn set_register(&self, unit: UnitId, address: u16, value: u16) {
        self.0.lock().unwrap().registers.insert((unit, address), value);
    }

    pub fn register(&self, unit: UnitId, address: u16) -> Option<u16> {
        self.0.lock().unwrap().registers.get(&(unit, address)).copied()
    }

    /// Makes every request to the register answer with an exception.
    pub fn fail(&self, unit: UnitId, address: u16) {
        self.0.lock().unwrap().failing.insert((unit, address));
    }

    pub fn heal(&self, unit: UnitId, address: u16) {
        let mut bus = self.0.lock().unwrap();
        bus.failing.remove(&(unit, address));
        bus.stalled.remove(&(unit, address));
    }

    /// Makes every request to the register hang without an answer.
    pub fn stall(&self, unit: UnitId, address: u16) {
        self.0.lock().unwrap().stalled.insert((unit, address));
    }

    pub fn refuse_connections(&self, refuse: bool) {
        self.0.lock().unwrap().refuse_connect = refuse;
    }

    pub fn writes(&self) -> Vec<Write> {
        self.0.lock().unwrap().writes.clone()
    }

    pub fn writes_to(&self, unit: UnitId) -> Vec<(u16, Vec<u16>)> {
        self.writes()
            .into_iter()
            .filter(|write| write.unit == unit)
            .map(|write| (write.address, write.values))
            .collect()
    }

    /// Holds the next write to `(unit, address)` until the returned sender
    /// fires. The receiver fires once the write is being held.
    pub fn pause_on(&self, unit: UnitId, address: u16) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (resume_tx, resume_rx) = oneshot::channel();

        self.0.lock().unwrap().pause = Some(Pause {
            unit,
            address,
            reached: reached_tx,
            resume: resume_rx,
        });

        (reached_rx, resume_tx)
    }

    fn check(&self, unit: UnitId, address: u16) -> Result<bool, TransportError> {
        let bus = self.0.lock().unwrap();
        if bus.failing.contains(&(unit, address)) {
            return Err(TransportError::Exception("Illegal data address".into()));
        }
        Ok(bus.stalled.contains(&(unit, address)))
    }

    fn take_pause(&self, unit: UnitId, address: u16) -> Option<Pause> {
        let mut bus = self.0.lock().unwrap();
        if bus
            .pause
            .as_ref()
            .is_some_and(|pause| pause.unit == unit && pause.address == address)
        {
            bus.pause.take()
        } else {
            None
        }
    }
}

pub struct FakeTransport {
    bus: FakeBus,
    connected: bool,
}

#[async_trait]
impl RegisterTransport for FakeTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.bus.0.lock().unwrap().refuse_connect {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        self.connected = true;
        Ok(())
    }

    async fn read_registers(
        &mut self,
        address: u16,
        count: u16,
        unit: UnitId,
    ) -> Result<Vec<u16>, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.bus.check(unit, address)? {
            return std::future::pending().await;
        }

        let bus = self.bus.0.lock().unwrap();
        Ok((address..address + count)
            .map(|register| bus.registers.get(&(unit, register)).copied().unwrap_or(0))
            .collect())
    }

    async fn write_registers(
        &mut self,
        address: u16,
        values: &[u16],
        unit: UnitId,
    ) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }

        if let Some(pause) = self.bus.take_pause(unit, address) {
            let _ = pause.reached.send(());
            let _ = pause.resume.await;
        }

        if self.bus.check(unit, address)? {
            return std::future::pending().await;
        }

        let mut bus = self.bus.0.lock().unwrap();
        for (offset, value) in values.iter().enumerate() {
            bus.registers.insert((unit, address + offset as u16), *value);
        }
        bus.writes.push(Write {
            unit,
            address,
            values: values.to_vec(),
        });

        Ok(())
    }

    async fn close(&mut self) {
        self.connected = false;
    }
}

#[derive(Default)]
struct Table {
    cells: HashMap<(u32, u32), CellValue>,
    fetches: usize,
}

/// External threshold table backed by a map of cells.
#[derive(Clone, Default)]
pub struct FakeTable(Arc<Mutex<Table>>);

impl FakeTable {
    pub fn source(&self) -> Arc<dyn ThresholdSource> {
        Arc::new(self.clone())
    }

    pub fn set(&self, row: u32, col: u32, value: impl Into<CellValue>) {
        self.0.lock().unwrap().cells.insert((row, col), value.into());
    }

    pub fn remove(&self, row: u32, col: u32) {
        self.0.lock().unwrap().cells.remove(&(row, col));
    }

    pub fn set_overload(&self, import_value: f64, import_limit: f64, export_value: f64, export_limit: f64) {
        self.set(1, 2, import_value);
        self.set(1, 3, import_limit);
        self.set(2, 2, export_value);
        self.set(2, 3, export_limit);
    }

    pub fn set_row(&self, row: u32, par_value: f64, limits: [f64; 5]) {
        self.set(row, 2, par_value);
        for (col, limit) in (3..).zip(limits) {
            self.set(row, col, limit);
        }
    }

    pub fn fetches(&self) -> usize {
        self.0.lock().unwrap().fetches
    }
}

#[async_trait]
impl ThresholdSource for FakeTable {
    async fn fetch_cell(&self, row: u32, col: u32) -> Result<CellValue, SourceError> {
        let mut table = self.0.lock().unwrap();
        table.fetches += 1;
        table
            .cells
            .get(&(row, col))
            .cloned()
            .ok_or(SourceError::Status { row, col, status: 404 })
    }
}

#[derive(Clone, Default)]
pub struct RecordingNotifier(Arc<Mutex<Vec<(String, String)>>>);

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<(String, String)> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_alert(&self, destination: &str, message: &str) -> Result<(), NotifyError> {
        self.0
            .lock()
            .unwrap()
            .push((destination.to_string(), message.to_string()));
        Ok(())
    }
}

pub struct MockApp {
    pub settings: Arc<Settings>,
    pub controller: Arc<Controller>,
    pub router: Router,
    pub bus: FakeBus,
    pub table: FakeTable,
    pub notifier: RecordingNotifier,
}

impl MockApp {
    pub fn new() -> Self {
        Self::with_devices(DEVICES)
    }

    pub fn with_devices(devices: &str) -> Self {
        let settings = Arc::new(Settings::from_toml(&format!("{SETTINGS}{devices}")).unwrap());
        let bus = FakeBus::default();
        let table = FakeTable::default();
        let notifier = RecordingNotifier::default();

        let controller = Arc::new(Controller::new(
            settings.clone(),
            bus.transport(),
            table.source(),
            Arc::new(notifier.clone()),
        ));
        let router = create_app(controller.clone());

        Self {
            settings,
            controller,
            router,
            bus,
            table,
            notifier,
        }
    }

    /// Calm grid, and targets of 70%, 100% and 20% for devices 1, 2 and 3.
    pub fn with_thresholds(self) -> Self {
        self.table.set_overload(500.0, 1000.0, 100.0, 500.0);
        self.table.set_row(4, 250.0, LIMITS);
        self.table.set_row(5, 50.0, LIMITS);
        self.table.set_row(6, 600.0, LIMITS);
        self
    }

    /// A loop wired to the same bus, table and notifier but with its own
    /// registry, for driving single passes by hand.
    pub fn auto_control(&self) -> (AutoControl, Arc<DeviceRegistry>) {
        let registry = Arc::new(DeviceRegistry::new(&self.settings.devices));
        let applier = Arc::new(PercentageApplier::new(
            registry.clone(),
            self.bus.transport(),
            self.settings.transport.default_max_flux,
            self.settings.transaction_timeout(),
        ));
        let control = AutoControl::new(
            self.settings.clone(),
            registry.clone(),
            applier,
            self.table.source(),
            Arc::new(self.notifier.clone()),
        );

        (control, registry)
    }
}

pub async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
