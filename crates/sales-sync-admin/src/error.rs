use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sales_sync_core::error::CoreError;
use sales_sync_engine::EngineError;
use sales_sync_store::StoreError;
use serde::Serialize;
use thiserror::Error;

/// Crate-boundary error for every admin handler. Each variant maps to one
/// `CoreError` classification and is rendered as `{error: string}` with the
/// status code spec.md §7 assigns.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("unknown sync id")]
    UnknownSync,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let core: CoreError = match self {
            AdminError::Core(e) => e,
            AdminError::Store(e) => e.into(),
            AdminError::Engine(e) => e.into(),
            AdminError::UnknownSync => CoreError::NotFound("sync id".to_string()),
        };

        let status = match core {
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::BadInput(_) => StatusCode::BAD_REQUEST,
            CoreError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::Conflict(_)
            | CoreError::Unavailable(_)
            | CoreError::InvalidCiphertext(_)
            | CoreError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorBody { error: core.to_string() })).into_response()
    }
}
