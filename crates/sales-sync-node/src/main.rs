//! sales-sync-node — the sales-data synchronization engine binary.
//!
//! Startup sequence:
//!   1. Open the store connection pool
//!   2. Run pending migrations
//!   3. Build the secret provider (AEAD, or a loud dev fallback)
//!   4. Construct the Sync Orchestrator and spawn its status-board reaper
//!   5. Start the administrative HTTP surface
//!   6. Idle — the orchestrator is driven entirely by admin requests

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sales_sync_admin::{build_router, AppState};
use sales_sync_crypto::{AeadSecretProvider, SecretProvider};
use sales_sync_engine::Orchestrator;
use sales_sync_remote::RemoteClient;
use sales_sync_store::Store;
use tracing::{info, warn};

/// A fixed, publicly-known key used only when no `ENCRYPTION_KEY` is set and
/// the process is a non-release build running outside `SALES_SYNC_ENV=production`.
/// Secrets encrypted with this key carry no confidentiality guarantee.
const DEV_ENCRYPTION_KEY: [u8; 32] = [0x42; 32];

#[derive(Parser, Debug)]
#[command(
    name = "sales-sync-node",
    version,
    about = "Incremental sales-data synchronization engine"
)]
struct Args {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Base URL of the partner sales API (e.g. `https://api.partner.example.com`).
    #[arg(long, env = "REMOTE_API_BASE_URL")]
    remote_api_base_url: String,

    /// 32-byte AEAD key for credential secrets, hex- or base64-encoded.
    #[arg(long, env = "ENCRYPTION_KEY")]
    encryption_key: Option<String>,

    /// Admin HTTP listen address.
    #[arg(long, env = "ADMIN_BIND_ADDR", default_value = "127.0.0.1:8787")]
    admin_bind_addr: SocketAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(
                    std::env::var("SALES_SYNC_LOG").unwrap_or_else(|_| "info,sales_sync=debug".to_string()),
                ))
                .unwrap(),
        )
        .init();

    let args = Args::parse();
    info!("sales-sync-node starting");

    // ── Store ─────────────────────────────────────────────────────────────────
    let store = Store::connect_with_default_pool(&args.database_url)
        .await
        .context("connecting to store")?;
    store.migrate().await.context("running migrations")?;

    // ── Secret provider ───────────────────────────────────────────────────────
    let secrets: Arc<dyn SecretProvider> = Arc::new(resolve_secret_provider(args.encryption_key.as_deref())?);

    // ── Orchestrator ──────────────────────────────────────────────────────────
    let remote = Arc::new(RemoteClient::new(args.remote_api_base_url.clone()));
    let orchestrator = Orchestrator::new(store.clone(), remote, secrets.clone());
    let _reaper = orchestrator.status_board().spawn_reaper();

    // ── Admin HTTP surface ────────────────────────────────────────────────────
    let state = AppState::new(store, orchestrator, secrets);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(args.admin_bind_addr)
        .await
        .with_context(|| format!("binding admin HTTP listener on {}", args.admin_bind_addr))?;
    info!(addr = %args.admin_bind_addr, "admin HTTP surface listening");

    axum::serve(listener, router)
        .await
        .context("admin HTTP server exited")?;

    Ok(())
}

fn resolve_secret_provider(encryption_key: Option<&str>) -> anyhow::Result<AeadSecretProvider> {
    if let Some(encoded) = encryption_key {
        return AeadSecretProvider::from_encoded_key(encoded)
            .map_err(|e| anyhow::anyhow!("invalid ENCRYPTION_KEY: {e}"));
    }

    let production = std::env::var("SALES_SYNC_ENV").map(|v| v == "production").unwrap_or(false);
    if production || !cfg!(debug_assertions) {
        anyhow::bail!("ENCRYPTION_KEY is required (production deployment or release build)");
    }

    warn!("ENCRYPTION_KEY not set — falling back to a fixed development key. DO NOT USE IN PRODUCTION.");
    Ok(AeadSecretProvider::from_key_bytes(DEV_ENCRYPTION_KEY))
}
