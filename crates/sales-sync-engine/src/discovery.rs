use std::str::FromStr;

use sales_sync_core::model::SyncProgress;
use sales_sync_core::types::{CredentialId, DateKey, Highwatermark};
use sales_sync_crypto::SecretProvider;
use sales_sync_remote::RemoteClient;
use sales_sync_store::Store;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::progress::ProgressEmitter;

/// Ask the partner API which dates have changed since this credential's
/// highwatermark, enqueue a task per date, and report the new highwatermark
/// the remote handed back. The caller commits that highwatermark — this
/// function never writes it, so a crash between discovery and fetch leaves
/// the credential exactly where it was before this call.
pub async fn discover_dates(
    store: &Store,
    remote: &RemoteClient,
    secrets: &dyn SecretProvider,
    credential_id: CredentialId,
    progress: &ProgressEmitter,
    cancel: &CancellationToken,
) -> Result<(usize, Highwatermark), EngineError> {
    let credential = store.get_credential(credential_id).await?;
    let api_key = secrets
        .decrypt(&credential.encrypted_secret)
        .map_err(|e| EngineError::Secret(e.to_string()))?;

    let response = remote
        .changed_dates(&api_key, credential.highwatermark, cancel)
        .await?;
    let new_highwatermark = response.result_highwatermark;

    let mut dates = Vec::with_capacity(response.dates.len());
    for raw in response.dates {
        match DateKey::from_str(&raw) {
            Ok(date) => dates.push(date),
            Err(_) => warn!(%credential_id, raw, "dropping unparseable date from changed-dates response"),
        }
    }
    dates.sort();
    dates.dedup();

    if dates.is_empty() {
        progress
            .emit(SyncProgress::Discovery { sync_id: progress.sync_id(), credential_id, total_tasks: 0 })
            .await;
        info!(%credential_id, new_highwatermark, "discovery found no changed dates");
        return Ok((0, new_highwatermark));
    }

    store
        .record_changed_dates_query(credential_id, credential.highwatermark, new_highwatermark, dates.len())
        .await?;
    store.delete_records_for_dates(credential_id, &dates).await?;

    for date in &dates {
        store.enqueue_task(credential_id, *date).await?;
    }

    progress
        .emit(SyncProgress::Discovery { sync_id: progress.sync_id(), credential_id, total_tasks: dates.len() })
        .await;
    info!(%credential_id, dates_found = dates.len(), new_highwatermark, "discovery phase complete");
    Ok((dates.len(), new_highwatermark))
}
