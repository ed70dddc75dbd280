pub mod flux;
pub mod interpolator;
pub mod overload;

pub use flux::{combine_power, percent_to_flux, DEFAULT_MAX_FLUX};
pub use interpolator::{interpolate, InterpolateError, ThresholdTable, BASE_PERCENTAGES};
pub use overload::OverloadReading;
