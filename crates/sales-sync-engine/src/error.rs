use sales_sync_core::error::CoreError;
use sales_sync_remote::RemoteError;
use sales_sync_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("decrypting credential secret: {0}")]
    Secret(String),

    #[error("sync already running for this credential")]
    AlreadyRunning,

    #[error("operation cancelled")]
    Cancelled,
}

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Cancelled => EngineError::Cancelled,
            other => EngineError::Secret(other.to_string()),
        }
    }
}

impl From<EngineError> for CoreError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled => CoreError::Cancelled,
            EngineError::AlreadyRunning => CoreError::Conflict(err.to_string()),
            EngineError::Store(e) => e.into(),
            EngineError::Remote(e) => e.into(),
            EngineError::Secret(msg) => CoreError::Other(msg),
        }
    }
}
