pub mod settings;

pub use settings::{
    CellRef, DeviceEntry, Layout, Logger, Notifier, Scheduler, Server, Settings, Source,
    Transport,
};
