use sales_sync_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("remote returned status {status}: {body}")]
    Status { status: u16, body: String, retryable: bool },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl RemoteError {
    /// Whether a retry is worth attempting: connection failures, timeouts,
    /// and the retryable status codes (429/408/5xx).
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Request(e) => e.is_timeout() || e.is_connect(),
            RemoteError::Status { retryable, .. } => *retryable,
            RemoteError::Parse(_) | RemoteError::Cancelled => false,
        }
    }
}

impl From<RemoteError> for CoreError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Cancelled => CoreError::Cancelled,
            other => CoreError::Other(other.to_string()),
        }
    }
}
