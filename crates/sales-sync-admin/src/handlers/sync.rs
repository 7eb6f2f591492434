use std::str::FromStr;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use sales_sync_core::model::{SyncProgress, SyncTask, TaskCounts};
use sales_sync_core::types::{CredentialId, SyncId};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::AdminError;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSyncBody {
    pub api_key_ids: Option<Vec<String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSyncResponse {
    pub sync_id: String,
}

#[instrument(skip(state, body))]
pub async fn start_sync(
    State(state): State<AppState>,
    Json(body): Json<StartSyncBody>,
) -> Result<impl IntoResponse, AdminError> {
    let credential_ids = body
        .api_key_ids
        .map(|ids| {
            ids.iter()
                .map(|id| CredentialId::from_str(id))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;

    // One cancellation token per batch; there is no admin endpoint to stop a
    // sync in progress, so nothing ever cancels this token today.
    let handle = state
        .orchestrator
        .run_sync_all(credential_ids, CancellationToken::new())
        .await?;

    Ok(Json(StartSyncResponse { sync_id: handle.sync_id.to_string() }))
}

#[instrument(skip(state))]
pub async fn sync_status(
    State(state): State<AppState>,
    Path(sync_id): Path<String>,
) -> Result<Json<SyncProgress>, AdminError> {
    let sync_id = SyncId::from_str(&sync_id)?;
    state
        .orchestrator
        .sync_status(sync_id)
        .await
        .map(Json)
        .ok_or(AdminError::UnknownSync)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialTaskCounts {
    pub credential_id: String,
    pub counts: TaskCounts,
}

#[instrument(skip(state))]
pub async fn all_task_counts(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AdminError> {
    let credentials = state.store.list_credentials().await?;
    let mut out = Vec::with_capacity(credentials.len());
    for credential in credentials {
        let counts = state.store.counts_by_status(credential.id).await?;
        out.push(CredentialTaskCounts { credential_id: credential.id.to_string(), counts });
    }
    Ok(Json(out))
}

#[instrument(skip(state))]
pub async fn task_counts_for_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskCounts>, AdminError> {
    let id = CredentialId::from_str(&id)?;
    Ok(Json(state.orchestrator.pending_status(id).await?))
}

const RECENT_FAILED_LIMIT: i64 = 100;

#[instrument(skip(state))]
pub async fn recent_failed(
    State(state): State<AppState>,
) -> Result<Json<Vec<SyncTask>>, AdminError> {
    Ok(Json(state.store.recent_failed_tasks(RECENT_FAILED_LIMIT).await?))
}

#[derive(Serialize)]
pub struct RetryResponse {
    pub reset: u64,
}

#[instrument(skip(state))]
pub async fn retry_failed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RetryResponse>, AdminError> {
    let id = CredentialId::from_str(&id)?;
    let reset = state.orchestrator.retry_failed(id).await?;
    Ok(Json(RetryResponse { reset }))
}
