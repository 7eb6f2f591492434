use std::time::Duration;

use sales_sync_core::constants::{STORE_ACQUIRE_TIMEOUT_SECS, STORE_DEFAULT_MAX_CONNECTIONS};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::error::StoreError;

/// Owns the connection pool shared by every persistence-layer query
/// helper (credentials, lookups, the task queue, the record writer).
#[derive(Clone)]
pub struct Store {
    pub(crate) pool: PgPool,
}

impl Store {
    /// Wrap an already-connected pool. Used by tests that get a
    /// migrated, disposable database handed to them by `#[sqlx::test]`.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with an explicit pool size, acquiring up to `max_connections`
    /// and failing a checkout after `STORE_ACQUIRE_TIMEOUT_SECS` rather than
    /// blocking forever.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(STORE_ACQUIRE_TIMEOUT_SECS))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// Connect using `STORE_MAX_CONNECTIONS` if set, otherwise the default.
    pub async fn connect_with_default_pool(database_url: &str) -> Result<Self, StoreError> {
        let max_connections = std::env::var("STORE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(STORE_DEFAULT_MAX_CONNECTIONS);
        Self::connect(database_url, max_connections).await
    }

    /// Run embedded migrations. Idempotent; safe to call on every startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("migrations applied");
        Ok(())
    }

    /// Round-trip a trivial query and report elapsed time. Used by the
    /// admin health endpoint.
    pub async fn health_check(&self) -> Result<Duration, StoreError> {
        let start = std::time::Instant::now();
        sqlx::query_as::<_, (i32,)>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(start.elapsed())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
