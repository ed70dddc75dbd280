use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transaction timed out after {0:?}")]
    Timeout(Duration),

    #[error("Not connected")]
    NotConnected,

    #[error("Device responded with exception: {0}")]
    Exception(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Expected {expected} registers, received {received}")]
    ShortRead { expected: u16, received: usize },
}

impl TransportError {
    /// Whether the connection itself is suspect and should be dropped.
    pub fn is_link_failure(&self) -> bool {
        matches!(
            self,
            TransportError::Io(_)
                | TransportError::Timeout(_)
                | TransportError::NotConnected
                | TransportError::Protocol(_)
        )
    }
}
