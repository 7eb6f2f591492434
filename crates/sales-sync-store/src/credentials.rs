use chrono::{DateTime, Utc};
use sales_sync_core::model::Credential;
use sales_sync_core::types::{CredentialId, Highwatermark};
use sqlx::FromRow;
use uuid::Uuid;

use crate::db::Store;
use crate::error::StoreError;

#[derive(FromRow)]
struct CredentialRow {
    id: Uuid,
    label: String,
    encrypted_secret: String,
    short_hash: String,
    highwatermark: i64,
    last_sync_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<CredentialRow> for Credential {
    fn from(row: CredentialRow) -> Self {
        Credential {
            id: CredentialId(row.id),
            label: row.label,
            encrypted_secret: row.encrypted_secret,
            short_hash: row.short_hash,
            highwatermark: row.highwatermark,
            last_sync_at: row.last_sync_at,
            created_at: row.created_at,
        }
    }
}

const CREDENTIAL_COLUMNS: &str =
    "id, label, encrypted_secret, short_hash, highwatermark, last_sync_at, created_at";

impl Store {
    pub async fn insert_credential(
        &self,
        label: &str,
        encrypted_secret: &str,
        short_hash: &str,
    ) -> Result<Credential, StoreError> {
        let row: CredentialRow = sqlx::query_as(&format!(
            "INSERT INTO credentials (id, label, encrypted_secret, short_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING {CREDENTIAL_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(label)
        .bind(encrypted_secret)
        .bind(short_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn get_credential(&self, id: CredentialId) -> Result<Credential, StoreError> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Credential::from)
            .ok_or_else(|| StoreError::NotFound(format!("credential {id}")))
    }

    pub async fn list_credentials(&self) -> Result<Vec<Credential>, StoreError> {
        let rows: Vec<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {CREDENTIAL_COLUMNS} FROM credentials ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Credential::from).collect())
    }

    pub async fn rename_credential(
        &self,
        id: CredentialId,
        label: &str,
    ) -> Result<Credential, StoreError> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "UPDATE credentials SET label = $1 WHERE id = $2 RETURNING {CREDENTIAL_COLUMNS}"
        ))
        .bind(label)
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Credential::from)
            .ok_or_else(|| StoreError::NotFound(format!("credential {id}")))
    }

    pub async fn delete_credential(&self, id: CredentialId) -> Result<(), StoreError> {
        // Sales records, sync tasks, and changed-dates queries cascade via
        // FK ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM credentials WHERE id = $1")
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("credential {id}")));
        }
        Ok(())
    }

    /// Advance the stored highwatermark and stamp `last_sync_at`. Callers
    /// are responsible for only calling this once every task in the batch
    /// that produced `new_highwatermark` has reached a terminal state.
    /// `GREATEST` guards the invariant that a credential's highwatermark
    /// never decreases, even if the remote returns a stale value.
    pub async fn commit_highwatermark(
        &self,
        id: CredentialId,
        new_highwatermark: Highwatermark,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE credentials SET highwatermark = GREATEST(highwatermark, $1), last_sync_at = now() WHERE id = $2",
        )
        .bind(new_highwatermark)
        .bind(id.0)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("credential {id}")));
        }
        Ok(())
    }
}
