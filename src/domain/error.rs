use thiserror::Error;

/// Errors that end (or prevent) a scan session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No scan target configured (set a target address or manufacturer)")]
    NoTarget,
    #[error("Bluetooth radio unavailable: {0}")]
    RadioUnavailable(#[from] RadioError),
    #[error("A scan session is already running")]
    AlreadyRunning,
}

/// Errors reported by a radio capability when asked to scan.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RadioError {
    #[error("Bluetooth adapter is disabled")]
    Disabled,
    #[error("No Bluetooth adapter found")]
    NoAdapter,
    #[error("Advertisement stream closed")]
    StreamClosed,
    #[error("Radio backend error: {0}")]
    Backend(String),
}

/// A malformed advertisement frame.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("AD structure at offset {offset} declares {declared} bytes, only {available} remain")]
    Truncated {
        offset: usize,
        declared: u8,
        available: usize,
    },
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload target not configured")]
    NotConfigured,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server rejected upload with status {0}")]
    Status(u16),
    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl From<reqwest::Error> for UploadError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            Self::Network("Request timed out".into())
        } else if let Some(status) = value.status() {
            Self::Status(status.as_u16())
        } else {
            Self::Network(value.to_string())
        }
    }
}
