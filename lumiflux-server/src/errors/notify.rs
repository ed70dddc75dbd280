#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Alert delivery failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Alert endpoint returned status {0}")]
    Status(u16),
}
