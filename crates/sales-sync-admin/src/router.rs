use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{health, keys, sync};
use crate::state::AppState;

/// Build the administrative REST router. Permissive CORS mirrors the base
/// workspace's RPC server, adapted to a `Router`/extractor service instead
/// of a JSON-RPC method dispatcher — the external contract here is plain
/// REST, not an RPC envelope.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/keys", get(keys::list_keys).post(keys::create_key))
        .route("/api/keys/:id", put(keys::rename_key).delete(keys::delete_key))
        .route("/api/keys/:id/stats", get(keys::key_stats))
        .route("/api/sync/start", post(sync::start_sync))
        .route("/api/sync/status/:sync_id", get(sync::sync_status))
        .route("/api/sync/tasks", get(sync::all_task_counts))
        .route("/api/sync/tasks/:api_key_id", get(sync::task_counts_for_key))
        .route("/api/sync/failed", get(sync::recent_failed))
        .route("/api/sync/retry/:api_key_id", post(sync::retry_failed))
        .route("/api/health", get(health::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
