pub mod auto_handle;
pub mod device_handle;

pub use auto_handle::*;
pub use device_handle::*;
