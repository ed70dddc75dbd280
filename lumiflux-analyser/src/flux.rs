/// Raw setpoint that corresponds to full brightness until a device reports its own.
pub const DEFAULT_MAX_FLUX: u16 = 1000;

/// Converts a brightness percentage into the raw setpoint register value.
pub fn percent_to_flux(percent: u8, max_flux: u16) -> u16 {
    let flux = (f64::from(percent) * f64::from(max_flux) / 100.0).round();
    flux.min(f64::from(u16::MAX)) as u16
}

/// Power is reported as a 32-bit word split over two registers, high word first.
pub fn combine_power(high: u16, low: u16) -> u32 {
    (u32::from(high) << 16) | u32::from(low)
}
