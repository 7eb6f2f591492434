use std::sync::Arc;

use sales_sync_crypto::SecretProvider;
use sales_sync_engine::Orchestrator;
use sales_sync_store::Store;

/// Shared application state handed to every handler via axum's `State`
/// extractor. Cheap to clone: everything inside is already `Arc`-backed or
/// a pooled connection handle.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub orchestrator: Orchestrator,
    pub secrets: Arc<dyn SecretProvider>,
}

impl AppState {
    pub fn new(store: Store, orchestrator: Orchestrator, secrets: Arc<dyn SecretProvider>) -> Self {
        Self { store, orchestrator, secrets }
    }
}
