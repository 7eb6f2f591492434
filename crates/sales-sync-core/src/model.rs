//! Domain types shared across the sync pipeline: the persisted `Credential`,
//! the lookup entities a sales record refers to, the `SalesRecord` row
//! itself, the `SyncTask` unit of work, the `ChangedDatesQuery` audit row,
//! and the progress events emitted while a sync runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Cents, CountryCode, CredentialId, DateKey, Highwatermark, RemoteId, SyncId};

/// A partner credential on file. `encrypted_secret` is the AEAD-wrapped API
/// key; plaintext never reaches this type. `highwatermark` and
/// `last_sync_at` together play the role of spec's one-to-one `SyncState`
/// entity — folded onto the credential row since the two never have an
/// independent lifecycle (see DESIGN.md).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credential {
    pub id: CredentialId,
    pub label: String,
    pub encrypted_secret: String,
    /// Last four characters of the plaintext secret, for display only.
    pub short_hash: String,
    /// Opaque remote cursor. `0` until the first successful discovery.
    pub highwatermark: Highwatermark,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct App {
    pub app_id: RemoteId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Package {
    pub package_id: RemoteId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bundle {
    pub bundle_id: RemoteId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Partner {
    pub partner_id: RemoteId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Country {
    pub country_code: CountryCode,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameItem {
    pub game_item_id: RemoteId,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Discount {
    pub discount_id: RemoteId,
    pub description: String,
    /// Percentage off, when the remote reports one for this discount kind.
    pub percentage: Option<i16>,
}

/// Append-only audit row for one `ChangedDates` call: what highwatermark
/// discovery started from, what the remote handed back, and how many
/// dates it produced. Never updated or deleted after insert.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangedDatesQuery {
    pub id: i64,
    pub credential_id: CredentialId,
    pub highwatermark_in: Highwatermark,
    pub highwatermark_out: Highwatermark,
    pub dates_found: i32,
    pub created_at: DateTime<Utc>,
}

/// One line item from the partner's detailed-sales endpoint, mapped into
/// cents and typed lookup references. Surrogate-keyed at the store; the
/// logical identity is `(credential_id, date, line_item_type, country_code,
/// platform, currency, package_id, bundle_id, app_id, game_item_id)`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalesRecord {
    pub credential_id: CredentialId,
    pub date: DateKey,
    pub line_item_type: String,
    pub app_id: RemoteId,
    pub package_id: Option<RemoteId>,
    pub bundle_id: Option<RemoteId>,
    pub partner_id: Option<RemoteId>,
    pub game_item_id: Option<RemoteId>,
    pub country_code: CountryCode,
    pub platform: String,
    pub currency: String,
    pub discount_id: Option<RemoteId>,
    pub discount_percentage: Option<i16>,
    /// List price in cents. `None` means the partner reported no price for
    /// this line (distinct from a genuine zero-price promotion).
    pub base_price_usd: Option<Cents>,
    pub sale_price_usd: Option<Cents>,
    pub avg_sale_price_usd: Option<Cents>,
    pub gross_units_sold: i64,
    pub gross_units_returned: i64,
    pub gross_units_activated: i64,
    pub net_units_sold: i64,
    pub gross_sales_usd: Cents,
    pub gross_returns_usd: Cents,
    pub net_sales_usd: Cents,
    pub net_tax_usd: Cents,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Complete,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Complete => "complete",
            TaskStatus::Failed => "failed",
        }
    }
}

/// A unit of work: "fetch detailed sales for this credential on this date."
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncTask {
    pub id: i64,
    pub credential_id: CredentialId,
    pub date: DateKey,
    pub status: TaskStatus,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Counts of `SyncTask` rows for one credential, grouped by status. What
/// `/api/sync/tasks/:apiKeyId` and `pending_status` return.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct TaskCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Per-credential summary backing `GET /api/keys/:id/stats`: how much data
/// has landed for this credential and what the task queue currently looks
/// like.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct CredentialStats {
    pub total_records: i64,
    pub total_gross_sales_usd: Cents,
    pub earliest_date: Option<DateKey>,
    pub latest_date: Option<DateKey>,
    pub tasks: TaskCounts,
}

/// Phase reached by a `run_sync` invocation, delivered over the progress
/// channel and folded into the shared status snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum SyncProgress {
    Discovery {
        sync_id: SyncId,
        credential_id: CredentialId,
        total_tasks: usize,
    },
    Populate {
        sync_id: SyncId,
        credential_id: CredentialId,
        total_tasks: usize,
        completed_tasks: usize,
        records_processed: usize,
        current_date: Option<DateKey>,
    },
    Complete {
        sync_id: SyncId,
        credential_id: CredentialId,
        records_processed: usize,
        message: String,
    },
    Error {
        sync_id: SyncId,
        credential_id: CredentialId,
        message: String,
    },
}
