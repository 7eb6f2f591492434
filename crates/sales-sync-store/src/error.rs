use sales_sync_core::error::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("pool unavailable: {0}")]
    Unavailable(String),
}

/// Classify the raw driver error per spec's failure model (§4.2): pool
/// exhaustion surfaces `Unavailable`, unique/foreign-key violations surface
/// `Conflict`, everything else is an opaque `Database` error.
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation() || db_err.is_foreign_key_violation() =>
            {
                StoreError::Conflict(err.to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => CoreError::NotFound(msg),
            StoreError::Conflict(msg) => CoreError::Conflict(msg),
            StoreError::Unavailable(msg) => CoreError::Unavailable(msg),
            other => CoreError::Other(other.to_string()),
        }
    }
}
