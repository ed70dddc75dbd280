mod applier;
mod controller;
mod notifier;
mod registry;
mod scheduler;
mod threshold_source;
mod transport;

pub use applier::*;
pub use controller::*;
pub use notifier::*;
pub use registry::*;
pub use scheduler::*;
pub use threshold_source::*;
pub use transport::*;
