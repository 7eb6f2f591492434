use chrono::{DateTime, Utc};
use sales_sync_core::model::{SyncTask, TaskCounts, TaskStatus};
use sales_sync_core::types::{CredentialId, DateKey};
use sqlx::FromRow;
use tracing::warn;

use crate::db::Store;
use crate::error::StoreError;

#[derive(FromRow)]
struct TaskRow {
    id: i64,
    credential_id: uuid::Uuid,
    date: chrono::NaiveDate,
    status: String,
    attempts: i32,
    last_error: Option<String>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TaskRow {
    fn status(&self) -> TaskStatus {
        match self.status.as_str() {
            "pending" => TaskStatus::Pending,
            "in_progress" => TaskStatus::InProgress,
            "complete" => TaskStatus::Complete,
            "failed" => TaskStatus::Failed,
            other => unreachable!("unknown sync_tasks.status value: {other}"),
        }
    }
}

impl From<TaskRow> for SyncTask {
    fn from(row: TaskRow) -> Self {
        SyncTask {
            id: row.id,
            credential_id: CredentialId(row.credential_id),
            date: DateKey(row.date),
            status: row.status(),
            attempts: row.attempts,
            last_error: row.last_error,
            created_at: row.created_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
        }
    }
}

const TASK_COLUMNS: &str =
    "id, credential_id, date, status, attempts, last_error, created_at, started_at, completed_at";

/// Persistent unit-of-work queue: one row per (credential, date) pending
/// fetch. `claim_batch` is the only way a row moves out of `pending`, and
/// it does so under `FOR UPDATE SKIP LOCKED` so concurrent fetch workers
/// never claim the same task twice.
impl Store {
    /// Insert a pending task for `(credential_id, date)`, or reset an
    /// existing one back to `pending` if it's already there (a rediscovery
    /// of a date that previously failed or completed). Per-invariant 3,
    /// timestamps and the error are cleared on reset.
    pub async fn enqueue_task(
        &self,
        credential_id: CredentialId,
        date: DateKey,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_tasks (credential_id, date, status, attempts)
             VALUES ($1, $2, 'pending', 0)
             ON CONFLICT (credential_id, date)
             DO UPDATE SET status = 'pending', last_error = NULL,
                           started_at = NULL, completed_at = NULL",
        )
        .bind(credential_id.0)
        .bind(date.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Atomically reserve up to `limit` pending tasks for `credential_id`,
    /// marking them `in_progress` and returning them to the caller.
    pub async fn claim_batch(
        &self,
        credential_id: CredentialId,
        limit: i64,
    ) -> Result<Vec<SyncTask>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let claimed: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM sync_tasks
             WHERE credential_id = $1 AND status = 'pending'
             ORDER BY date
             LIMIT $2
             FOR UPDATE SKIP LOCKED"
        ))
        .bind(credential_id.0)
        .bind(limit)
        .fetch_all(&mut *tx)
        .await?;

        for row in &claimed {
            sqlx::query(
                "UPDATE sync_tasks SET status = 'in_progress', started_at = now() WHERE id = $1",
            )
            .bind(row.id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(claimed.into_iter().map(SyncTask::from).collect())
    }

    pub async fn complete_task(&self, task_id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE sync_tasks SET status = 'complete', completed_at = now() WHERE id = $1")
            .bind(task_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn fail_task(&self, task_id: i64, error: &str) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sync_tasks
             SET status = 'failed', attempts = attempts + 1, last_error = $2, completed_at = now()
             WHERE id = $1",
        )
        .bind(task_id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reset every `failed` task for `credential_id` back to `pending`.
    /// Returns the number of tasks reset.
    pub async fn reset_failed(&self, credential_id: CredentialId) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE sync_tasks
             SET status = 'pending', last_error = NULL, started_at = NULL, completed_at = NULL
             WHERE credential_id = $1 AND status = 'failed'",
        )
        .bind(credential_id.0)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn counts_by_status(
        &self,
        credential_id: CredentialId,
    ) -> Result<TaskCounts, StoreError> {
        #[derive(FromRow)]
        struct CountRow {
            status: String,
            count: i64,
        }

        let rows: Vec<CountRow> = sqlx::query_as(
            "SELECT status, COUNT(*) as count FROM sync_tasks
             WHERE credential_id = $1 GROUP BY status",
        )
        .bind(credential_id.0)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = TaskCounts::default();
        for row in rows {
            match row.status.as_str() {
                "pending" => counts.pending = row.count,
                "in_progress" => counts.in_progress = row.count,
                "complete" => counts.completed = row.count,
                "failed" => counts.failed = row.count,
                other => warn!(status = other, "ignoring unknown sync_tasks.status in counts_by_status"),
            }
        }
        Ok(counts)
    }

    /// Most recently failed tasks across all credentials, most recent
    /// first. Backs `/api/sync/failed`.
    pub async fn recent_failed_tasks(&self, limit: i64) -> Result<Vec<SyncTask>, StoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {TASK_COLUMNS} FROM sync_tasks
             WHERE status = 'failed'
             ORDER BY completed_at DESC NULLS LAST
             LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SyncTask::from).collect())
    }

    /// Reset any task still `in_progress` after `older_than` back to
    /// `pending`. Never invoked automatically by the orchestrator; an
    /// operator-triggered recovery step for tasks orphaned by a crashed
    /// worker. Every row it touches is logged.
    pub async fn reclaim_stale(&self, older_than: DateTime<Utc>) -> Result<u64, StoreError> {
        let stale: Vec<(i64, uuid::Uuid, chrono::NaiveDate)> = sqlx::query_as(
            "SELECT id, credential_id, date FROM sync_tasks
             WHERE status = 'in_progress' AND started_at < $1",
        )
        .bind(older_than)
        .fetch_all(&self.pool)
        .await?;

        for (id, credential_id, date) in &stale {
            warn!(task_id = id, %credential_id, %date, "reclaiming stale in-progress task");
        }

        let result = sqlx::query(
            "UPDATE sync_tasks SET status = 'pending', started_at = NULL
             WHERE status = 'in_progress' AND started_at < $1",
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
