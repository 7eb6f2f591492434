use chrono::{DateTime, Utc};
use sales_sync_core::model::ChangedDatesQuery;
use sales_sync_core::types::{CredentialId, Highwatermark};
use sqlx::FromRow;

use crate::db::Store;
use crate::error::StoreError;

#[derive(FromRow)]
struct ChangedDatesQueryRow {
    id: i64,
    credential_id: uuid::Uuid,
    highwatermark_in: i64,
    highwatermark_out: i64,
    dates_found: i32,
    created_at: DateTime<Utc>,
}

impl From<ChangedDatesQueryRow> for ChangedDatesQuery {
    fn from(row: ChangedDatesQueryRow) -> Self {
        ChangedDatesQuery {
            id: row.id,
            credential_id: CredentialId(row.credential_id),
            highwatermark_in: row.highwatermark_in,
            highwatermark_out: row.highwatermark_out,
            dates_found: row.dates_found,
            created_at: row.created_at,
        }
    }
}

/// Append-only audit log of discovery's calls to the remote's changed-dates
/// endpoint. Written once per discovery attempt that reaches the remote,
/// regardless of whether any dates came back.
impl Store {
    pub async fn record_changed_dates_query(
        &self,
        credential_id: CredentialId,
        highwatermark_in: Highwatermark,
        highwatermark_out: Highwatermark,
        dates_found: usize,
    ) -> Result<ChangedDatesQuery, StoreError> {
        let row: ChangedDatesQueryRow = sqlx::query_as(
            "INSERT INTO changed_dates_queries
                (credential_id, highwatermark_in, highwatermark_out, dates_found)
             VALUES ($1, $2, $3, $4)
             RETURNING id, credential_id, highwatermark_in, highwatermark_out, dates_found, created_at",
        )
        .bind(credential_id.0)
        .bind(highwatermark_in)
        .bind(highwatermark_out)
        .bind(dates_found as i32)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn recent_changed_dates_queries(
        &self,
        credential_id: CredentialId,
        limit: i64,
    ) -> Result<Vec<ChangedDatesQuery>, StoreError> {
        let rows: Vec<ChangedDatesQueryRow> = sqlx::query_as(
            "SELECT id, credential_id, highwatermark_in, highwatermark_out, dates_found, created_at
             FROM changed_dates_queries
             WHERE credential_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(credential_id.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChangedDatesQuery::from).collect())
    }
}
