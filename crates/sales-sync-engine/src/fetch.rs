use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sales_sync_core::constants::{CONCURRENT_TASKS, TASK_BATCH_SIZE};
use sales_sync_core::model::{SyncProgress, SyncTask};
use sales_sync_core::types::CredentialId;
use sales_sync_crypto::SecretProvider;
use sales_sync_remote::RemoteClient;
use sales_sync_store::Store;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::EngineError;
use crate::mapping::{dedup_lookups, map_page, MappedPage};
use crate::progress::ProgressEmitter;

pub struct FetchOutcome {
    pub completed: usize,
    pub failed: usize,
    pub records_processed: usize,
}

/// Drain the task queue for `credential_id`: claim batches of pending
/// tasks, fetch each date's full (possibly paginated) detail set with up
/// to `CONCURRENT_TASKS` dates in flight at once, and write the results.
/// A single date's failure is isolated — it's marked `failed` and the
/// phase continues with the rest of the batch.
pub async fn fetch_phase(
    store: &Store,
    remote: &RemoteClient,
    secrets: &dyn SecretProvider,
    credential_id: CredentialId,
    total_tasks: usize,
    progress: &ProgressEmitter,
    cancel: &CancellationToken,
) -> Result<FetchOutcome, EngineError> {
    let credential = store.get_credential(credential_id).await?;
    let api_key = Arc::new(
        secrets
            .decrypt(&credential.encrypted_secret)
            .map_err(|e| EngineError::Secret(e.to_string()))?,
    );

    let semaphore = Arc::new(Semaphore::new(CONCURRENT_TASKS));
    let completed_tasks = Arc::new(AtomicUsize::new(0));
    let records_processed = Arc::new(AtomicUsize::new(0));
    let mut failed = 0usize;

    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let batch = store
            .claim_batch(credential_id, TASK_BATCH_SIZE as i64)
            .await?;
        if batch.is_empty() {
            break;
        }

        let mut handles = Vec::with_capacity(batch.len());
        for task in batch {
            let semaphore = semaphore.clone();
            let store = store.clone();
            let api_key = api_key.clone();
            let cancel = cancel.clone();
            let progress = progress.clone();
            let completed_tasks = completed_tasks.clone();
            let records_processed = records_processed.clone();

            handles.push(async move {
                let permit = semaphore.acquire_owned().await.expect("semaphore not closed");
                let date = task.date;
                let result = fetch_one_task(&store, remote, &api_key, task, &cancel).await;
                drop(permit);

                if let Ok(count) = &result {
                    let completed = completed_tasks.fetch_add(1, Ordering::SeqCst) + 1;
                    let processed = records_processed.fetch_add(*count, Ordering::SeqCst) + count;
                    progress
                        .emit(SyncProgress::Populate {
                            sync_id: progress.sync_id(),
                            credential_id,
                            total_tasks,
                            completed_tasks: completed,
                            records_processed: processed,
                            current_date: Some(date),
                        })
                        .await;
                }
                result
            });
        }

        let results = futures::future::join_all(handles).await;
        for result in results {
            match result {
                // Cancellation is not a task failure: the task stays
                // `in_progress` and the whole phase unwinds rather than
                // continuing to claim further batches.
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(err) => {
                    error!(%credential_id, error = %err, "date fetch failed");
                    failed += 1;
                }
                Ok(_) => {}
            }
        }
    }

    let completed = completed_tasks.load(Ordering::SeqCst);
    let records_processed = records_processed.load(Ordering::SeqCst);
    info!(%credential_id, completed, failed, records_processed, "fetch phase complete");
    Ok(FetchOutcome { completed, failed, records_processed })
}

async fn fetch_one_task(
    store: &Store,
    remote: &RemoteClient,
    api_key: &str,
    task: SyncTask,
    cancel: &CancellationToken,
) -> Result<usize, EngineError> {
    let result = fetch_and_store_date(store, remote, api_key, &task, cancel).await;
    match result {
        Ok(count) => {
            store.complete_task(task.id).await?;
            Ok(count)
        }
        // A cancelled task is left `in_progress`: per spec, an operator must
        // reset it (or an explicit `reclaim_stale` sweep) rather than the
        // fetch phase silently recording it as a failure.
        Err(EngineError::Cancelled) => Err(EngineError::Cancelled),
        Err(err) => {
            store.fail_task(task.id, &err.to_string()).await?;
            Err(err)
        }
    }
}

async fn fetch_and_store_date(
    store: &Store,
    remote: &RemoteClient,
    api_key: &str,
    task: &SyncTask,
    cancel: &CancellationToken,
) -> Result<usize, EngineError> {
    let date_str = task.date.to_string();
    let mut cursor = 0i64;
    let mut mapped = MappedPage::default();

    loop {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let page = remote
            .detailed_sales(api_key, &date_str, cursor, cancel)
            .await?;

        let advanced = page.max_id > cursor;
        let has_results = !page.results.is_empty();
        let max_id = page.max_id;

        map_page(task.credential_id, task.date, page, &mut mapped);

        if !(advanced && has_results) {
            break;
        }
        cursor = max_id;
    }

    dedup_lookups(&mut mapped);

    store.upsert_apps(&mapped.apps).await?;
    store.upsert_packages(&mapped.packages).await?;
    store.upsert_bundles(&mapped.bundles).await?;
    store.upsert_partners(&mapped.partners).await?;
    store.upsert_countries(&mapped.countries).await?;
    store.upsert_game_items(&mapped.game_items).await?;
    store.upsert_discounts(&mapped.discounts).await?;

    let record_count = mapped.records.len();
    store
        .replace_day(task.credential_id, task.date, &mapped.records)
        .await?;

    Ok(record_count)
}
