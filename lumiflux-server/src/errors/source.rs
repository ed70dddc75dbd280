#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Threshold request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Threshold source returned status {status} for cell ({row}, {col})")]
    Status { row: u32, col: u32, status: u16 },

    #[error("Malformed threshold cell ({row}, {col}): {reason}")]
    Malformed { row: u32, col: u32, reason: String },

    #[error("Threshold cell ({row}, {col}) is not numeric: {value:?}")]
    NotNumeric { row: u32, col: u32, value: String },
}
