mod control;
mod device;

pub use control::*;
pub use device::*;

/// Logical device identifier, fixed by configuration.
pub type DeviceId = u8;

/// Protocol-level unit address on the register transport.
pub type UnitId = u8;
