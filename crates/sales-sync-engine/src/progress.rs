use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sales_sync_core::constants::{SYNC_ALL_PROGRESS_TTL_SECS, SYNC_ALL_REAPER_INTERVAL_SECS};
use sales_sync_core::model::SyncProgress;
use sales_sync_core::types::SyncId;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

pub type ProgressSender = mpsc::Sender<SyncProgress>;
pub type ProgressReceiver = mpsc::Receiver<SyncProgress>;

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::channel(256)
}

#[derive(Clone)]
struct StatusEntry {
    latest: SyncProgress,
    terminal_since: Option<DateTime<Utc>>,
}

/// Shared snapshot of the most recent progress event per in-flight (or
/// recently finished) sync, keyed by `SyncId`. Entries are written by
/// whoever drives a sync (alongside sending the same event on that sync's
/// progress channel) and read by the admin status endpoints. Entries
/// reaching a terminal phase (`complete` or `error`) are swept out
/// `SYNC_ALL_PROGRESS_TTL_SECS` later by `spawn_reaper`.
#[derive(Clone, Default)]
pub struct SyncStatusBoard {
    entries: Arc<RwLock<HashMap<SyncId, StatusEntry>>>,
}

impl SyncStatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, sync_id: SyncId, progress: SyncProgress) {
        let terminal_since =
            matches!(progress, SyncProgress::Complete { .. } | SyncProgress::Error { .. })
                .then(Utc::now);

        let mut entries = self.entries.write().await;
        entries.insert(
            sync_id,
            StatusEntry {
                latest: progress,
                terminal_since,
            },
        );
    }

    pub async fn snapshot(&self, sync_id: SyncId) -> Option<SyncProgress> {
        self.entries.read().await.get(&sync_id).map(|e| e.latest.clone())
    }

    pub async fn all_snapshots(&self) -> Vec<SyncProgress> {
        self.entries.read().await.values().map(|e| e.latest.clone()).collect()
    }

    /// Spawn the background sweep of expired terminal entries. Call once
    /// per process; the returned handle can be aborted on shutdown.
    pub fn spawn_reaper(&self) -> tokio::task::JoinHandle<()> {
        let board = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(SYNC_ALL_REAPER_INTERVAL_SECS));
            loop {
                interval.tick().await;
                let cutoff = Utc::now() - chrono::Duration::seconds(SYNC_ALL_PROGRESS_TTL_SECS);
                let mut entries = board.entries.write().await;
                let before = entries.len();
                entries.retain(|_, entry| match entry.terminal_since {
                    Some(since) => since > cutoff,
                    None => true,
                });
                let removed = before - entries.len();
                if removed > 0 {
                    debug!(removed, "swept expired sync progress entries");
                }
            }
        })
    }
}

/// Bundles a `run_sync`/`run_sync_all` invocation's progress channel
/// together with the shared status board so every emitted event reaches
/// both at once: discovery and fetch only ever call `emit`, never touch
/// the channel or board directly.
#[derive(Clone)]
pub struct ProgressEmitter {
    sync_id: SyncId,
    sender: ProgressSender,
    board: SyncStatusBoard,
}

impl ProgressEmitter {
    pub fn new(sync_id: SyncId, sender: ProgressSender, board: SyncStatusBoard) -> Self {
        Self { sync_id, sender, board }
    }

    pub fn sync_id(&self) -> SyncId {
        self.sync_id
    }

    /// Record `event` on the shared board and forward it on the channel.
    /// The channel send is best-effort: a caller who dropped their
    /// receiver still sees the event through `sync_status`.
    pub async fn emit(&self, event: SyncProgress) {
        self.board.record(self.sync_id, event.clone()).await;
        let _ = self.sender.send(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_reflects_latest_recorded_event() {
        let board = SyncStatusBoard::new();
        let sync_id = SyncId::new();
        let credential_id = sales_sync_core::types::CredentialId::new();

        board
            .record(
                sync_id,
                SyncProgress::Discovery {
                    sync_id,
                    credential_id,
                    total_tasks: 3,
                },
            )
            .await;

        match board.snapshot(sync_id).await {
            Some(SyncProgress::Discovery { total_tasks, .. }) => assert_eq!(total_tasks, 3),
            other => panic!("unexpected snapshot: {other:?}"),
        }
    }
}
