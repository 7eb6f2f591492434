use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use sales_sync_core::error::CoreError;
use sales_sync_core::model::{Credential, CredentialStats};
use sales_sync_core::types::CredentialId;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::AdminError;
use crate::state::AppState;

/// Public view of a stored credential. Never carries `encrypted_secret`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialView {
    pub id: String,
    pub label: String,
    pub tail_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<Credential> for CredentialView {
    fn from(c: Credential) -> Self {
        Self {
            id: c.id.to_string(),
            label: c.label,
            tail_hash: c.short_hash,
            created_at: c.created_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyBody {
    pub key: String,
    pub display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameKeyBody {
    pub display_name: String,
}

#[instrument(skip(state))]
pub async fn list_keys(State(state): State<AppState>) -> Result<impl IntoResponse, AdminError> {
    let credentials = state.store.list_credentials().await?;
    let views: Vec<CredentialView> = credentials.into_iter().map(CredentialView::from).collect();
    Ok(Json(views))
}

#[instrument(skip(state, body), fields(display_name = body.display_name.as_deref()))]
pub async fn create_key(
    State(state): State<AppState>,
    Json(body): Json<CreateKeyBody>,
) -> Result<impl IntoResponse, AdminError> {
    if body.key.trim().is_empty() {
        return Err(AdminError::Core(CoreError::BadInput("key must not be empty".to_string())));
    }

    let encrypted = state.secrets.encrypt(&body.key)?;
    let tail_hash = state.secrets.short_hash(&body.key);
    let label = body
        .display_name
        .unwrap_or_else(|| format!("partner-{tail_hash}"));

    let credential = state.store.insert_credential(&label, &encrypted, &tail_hash).await?;
    Ok((StatusCode::CREATED, Json(CredentialView::from(credential))))
}

#[instrument(skip(state, body))]
pub async fn rename_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RenameKeyBody>,
) -> Result<impl IntoResponse, AdminError> {
    let id = CredentialId::from_str(&id)?;
    let credential = state.store.rename_credential(id, &body.display_name).await?;
    Ok(Json(CredentialView::from(credential)))
}

#[instrument(skip(state))]
pub async fn delete_key(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AdminError> {
    let id = CredentialId::from_str(&id)?;
    state.store.delete_credential(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn key_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CredentialStats>, AdminError> {
    let id = CredentialId::from_str(&id)?;
    // Confirm the credential exists before reporting a (possibly all-zero)
    // stats row for it.
    state.store.get_credential(id).await?;
    let stats = state.store.credential_stats(id).await?;
    Ok(Json(stats))
}
