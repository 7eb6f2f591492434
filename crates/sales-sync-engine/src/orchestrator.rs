use std::sync::Arc;

use sales_sync_core::model::{SyncProgress, TaskCounts};
use sales_sync_core::types::{CredentialId, SyncId};
use sales_sync_crypto::SecretProvider;
use sales_sync_remote::RemoteClient;
use sales_sync_store::Store;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::discovery::discover_dates;
use crate::error::EngineError;
use crate::fetch::fetch_phase;
use crate::progress::{progress_channel, ProgressEmitter, ProgressReceiver, SyncStatusBoard};

/// What `run_sync` produced for one credential.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSyncOutcome {
    pub dates_found: usize,
    pub records_processed: usize,
}

/// What `run_sync_all` kicked off: the caller polls `sync_status(sync_id)`
/// for progress rather than awaiting completion directly.
#[derive(Debug, Clone, Copy)]
pub struct RunSyncAllHandle {
    pub sync_id: SyncId,
}

/// Drives discovery and fetch for one or many credentials. Owns nothing
/// the persistence and remote crates don't already own — this is purely
/// the coordination layer spec.md calls the Sync Orchestrator (C9).
#[derive(Clone)]
pub struct Orchestrator {
    store: Store,
    remote: Arc<RemoteClient>,
    secrets: Arc<dyn SecretProvider>,
    board: SyncStatusBoard,
}

impl Orchestrator {
    pub fn new(store: Store, remote: Arc<RemoteClient>, secrets: Arc<dyn SecretProvider>) -> Self {
        Self { store, remote, secrets, board: SyncStatusBoard::new() }
    }

    /// Status board shared with the admin HTTP layer; also used to spawn
    /// the background reaper once at process start.
    pub fn status_board(&self) -> &SyncStatusBoard {
        &self.board
    }

    /// Run discovery then fetch for one credential, driven by `sync_id`
    /// (shared across an entire `run_sync_all` batch, or freshly minted by
    /// a standalone caller). Every progress event this call produces is
    /// recorded on the shared status board as well as sent on `sender`.
    pub async fn run_sync(
        &self,
        credential_id: CredentialId,
        sync_id: SyncId,
        sender: crate::progress::ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<RunSyncOutcome, EngineError> {
        let progress = ProgressEmitter::new(sync_id, sender, self.board.clone());

        let result = self.run_sync_inner(credential_id, &progress, cancel).await;
        if let Err(err) = &result {
            progress
                .emit(SyncProgress::Error { sync_id, credential_id, message: err.to_string() })
                .await;
        }
        result
    }

    async fn run_sync_inner(
        &self,
        credential_id: CredentialId,
        progress: &ProgressEmitter,
        cancel: &CancellationToken,
    ) -> Result<RunSyncOutcome, EngineError> {
        let (dates_found, new_highwatermark) = discover_dates(
            &self.store,
            &self.remote,
            self.secrets.as_ref(),
            credential_id,
            progress,
            cancel,
        )
        .await?;

        if dates_found == 0 {
            self.store.commit_highwatermark(credential_id, new_highwatermark).await?;
            progress
                .emit(SyncProgress::Complete {
                    sync_id: progress.sync_id(),
                    credential_id,
                    records_processed: 0,
                    message: "no changed dates".to_string(),
                })
                .await;
            return Ok(RunSyncOutcome { dates_found: 0, records_processed: 0 });
        }

        let outcome = fetch_phase(
            &self.store,
            &self.remote,
            self.secrets.as_ref(),
            credential_id,
            dates_found,
            progress,
            cancel,
        )
        .await?;

        if outcome.failed == 0 {
            self.store.commit_highwatermark(credential_id, new_highwatermark).await?;
        } else {
            info!(
                %credential_id,
                failed = outcome.failed,
                "not advancing highwatermark: one or more tasks failed in this batch"
            );
        }

        progress
            .emit(SyncProgress::Complete {
                sync_id: progress.sync_id(),
                credential_id,
                records_processed: outcome.records_processed,
                message: format!(
                    "{} dates processed, {} failed",
                    outcome.completed, outcome.failed
                ),
            })
            .await;

        Ok(RunSyncOutcome { dates_found, records_processed: outcome.records_processed })
    }

    /// Spawn a background driver that runs `run_sync` for each credential in
    /// `credential_ids` (or every credential on file, if `None`) in
    /// sequence, publishing progress under one shared `sync_id`. Returns
    /// immediately with a handle the caller uses to poll `sync_status`.
    pub async fn run_sync_all(
        &self,
        credential_ids: Option<Vec<CredentialId>>,
        cancel: CancellationToken,
    ) -> Result<RunSyncAllHandle, EngineError> {
        let credential_ids = match credential_ids {
            Some(ids) => ids,
            None => self
                .store
                .list_credentials()
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect(),
        };

        let sync_id = SyncId::new();
        let orchestrator = self.clone();

        tokio::spawn(async move {
            let (sender, _receiver): (_, ProgressReceiver) = progress_channel();
            for credential_id in credential_ids {
                if cancel.is_cancelled() {
                    break;
                }
                if let Err(err) = orchestrator
                    .run_sync(credential_id, sync_id, sender.clone(), &cancel)
                    .await
                {
                    error!(%credential_id, %sync_id, error = %err, "run_sync_all: credential sync failed");
                }
            }
        });

        Ok(RunSyncAllHandle { sync_id })
    }

    pub async fn sync_status(&self, sync_id: SyncId) -> Option<SyncProgress> {
        self.board.snapshot(sync_id).await
    }

    pub async fn pending_status(&self, credential_id: CredentialId) -> Result<TaskCounts, EngineError> {
        Ok(self.store.counts_by_status(credential_id).await?)
    }

    pub async fn retry_failed(&self, credential_id: CredentialId) -> Result<u64, EngineError> {
        Ok(self.store.reset_failed(credential_id).await?)
    }
}
