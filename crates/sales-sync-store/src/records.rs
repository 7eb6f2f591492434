use sales_sync_core::constants::RECORD_WRITER_BATCH_SIZE;
use sales_sync_core::model::{CredentialStats, SalesRecord};
use sales_sync_core::types::{Cents, CredentialId, DateKey};
use sqlx::{FromRow, QueryBuilder};

use crate::db::Store;
use crate::error::StoreError;

/// Buffers mapped sales rows and flushes them in batches. Idempotency for
/// a (credential, date) slice comes from `replace_day`, which deletes any
/// rows already stored for that day before inserting the fresh set inside
/// the same transaction — re-running a fetch for an already-synced date
/// produces the same stored rows, not duplicates.
impl Store {
    pub async fn replace_day(
        &self,
        credential_id: CredentialId,
        date: DateKey,
        records: &[SalesRecord],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM sales_records WHERE credential_id = $1 AND date = $2")
            .bind(credential_id.0)
            .bind(date.0)
            .execute(&mut *tx)
            .await?;

        for chunk in records.chunks(RECORD_WRITER_BATCH_SIZE) {
            if chunk.is_empty() {
                continue;
            }

            let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(
                "INSERT INTO sales_records (
                    credential_id, date, line_item_type, app_id, package_id, bundle_id,
                    partner_id, game_item_id, country_code, platform, currency,
                    discount_id, discount_percentage, base_price_usd, sale_price_usd,
                    avg_sale_price_usd, gross_units_sold, gross_units_returned,
                    gross_units_activated, net_units_sold, gross_sales_usd,
                    gross_returns_usd, net_sales_usd, net_tax_usd
                ) ",
            );

            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.credential_id.0)
                    .push_bind(record.date.0)
                    .push_bind(record.line_item_type.clone())
                    .push_bind(record.app_id.0)
                    .push_bind(record.package_id.map(|v| v.0))
                    .push_bind(record.bundle_id.map(|v| v.0))
                    .push_bind(record.partner_id.map(|v| v.0))
                    .push_bind(record.game_item_id.map(|v| v.0))
                    .push_bind(record.country_code.0.clone())
                    .push_bind(record.platform.clone())
                    .push_bind(record.currency.clone())
                    .push_bind(record.discount_id.map(|v| v.0))
                    .push_bind(record.discount_percentage)
                    .push_bind(record.base_price_usd.map(|v| v.0))
                    .push_bind(record.sale_price_usd.map(|v| v.0))
                    .push_bind(record.avg_sale_price_usd.map(|v| v.0))
                    .push_bind(record.gross_units_sold)
                    .push_bind(record.gross_units_returned)
                    .push_bind(record.gross_units_activated)
                    .push_bind(record.net_units_sold)
                    .push_bind(record.gross_sales_usd.0)
                    .push_bind(record.gross_returns_usd.0)
                    .push_bind(record.net_sales_usd.0)
                    .push_bind(record.net_tax_usd.0);
            });

            builder.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete sales rows for every date in `dates` for `credential_id`, in
    /// one statement, ahead of enqueuing their tasks (discovery step 5) —
    /// this is what makes a re-discovered date's stale rows disappear
    /// before the retry has a chance to overwrite them.
    pub async fn delete_records_for_dates(
        &self,
        credential_id: CredentialId,
        dates: &[DateKey],
    ) -> Result<u64, StoreError> {
        if dates.is_empty() {
            return Ok(0);
        }
        let naive_dates: Vec<chrono::NaiveDate> = dates.iter().map(|d| d.0).collect();
        let result = sqlx::query(
            "DELETE FROM sales_records WHERE credential_id = $1 AND date = ANY($2)",
        )
        .bind(credential_id.0)
        .bind(&naive_dates)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_records_for_day(
        &self,
        credential_id: CredentialId,
        date: DateKey,
    ) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sales_records WHERE credential_id = $1 AND date = $2",
        )
        .bind(credential_id.0)
        .bind(date.0)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Aggregate summary for one credential: rows landed, gross sales total,
    /// the date span covered, and the current task queue breakdown. Backs
    /// `GET /api/keys/:id/stats`.
    pub async fn credential_stats(
        &self,
        credential_id: CredentialId,
    ) -> Result<CredentialStats, StoreError> {
        #[derive(FromRow)]
        struct RecordAggregateRow {
            total_records: i64,
            total_gross_sales_usd: Option<i64>,
            earliest_date: Option<chrono::NaiveDate>,
            latest_date: Option<chrono::NaiveDate>,
        }

        let aggregate: RecordAggregateRow = sqlx::query_as(
            "SELECT COUNT(*) as total_records,
                    SUM(gross_sales_usd) as total_gross_sales_usd,
                    MIN(date) as earliest_date,
                    MAX(date) as latest_date
             FROM sales_records WHERE credential_id = $1",
        )
        .bind(credential_id.0)
        .fetch_one(&self.pool)
        .await?;

        let tasks = self.counts_by_status(credential_id).await?;

        Ok(CredentialStats {
            total_records: aggregate.total_records,
            total_gross_sales_usd: Cents(aggregate.total_gross_sales_usd.unwrap_or(0)),
            earliest_date: aggregate.earliest_date.map(DateKey),
            latest_date: aggregate.latest_date.map(DateKey),
            tasks,
        })
    }
}
