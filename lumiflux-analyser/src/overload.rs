/// Headroom kept below the import limit before it counts as overload.
pub const IMPORT_MARGIN: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverloadReading {
    pub import_value: f64,
    pub import_limit: f64,
    pub export_value: f64,
    pub export_limit: f64,
}

impl OverloadReading {
    pub fn is_overloaded(&self) -> bool {
        self.import_value > self.import_limit - IMPORT_MARGIN || self.export_value > self.export_limit
    }
}
