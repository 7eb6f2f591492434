//! ─── Sales Sync Constants ────────────────────────────────────────────────────

// ── Remote client ─────────────────────────────────────────────────────────────

/// Maximum retry attempts for a single remote request before giving up.
pub const REMOTE_MAX_RETRIES: u32 = 3;

/// Per-attempt request timeout.
pub const REMOTE_ATTEMPT_TIMEOUT_SECS: u64 = 30;

/// HTTP status codes treated as retryable in addition to connection errors.
pub const RETRYABLE_STATUS_CODES: [u16; 3] = [429, 408, 503];

// ── Fetch phase ───────────────────────────────────────────────────────────────

/// Number of sync tasks claimed per batch by the fetch phase.
pub const TASK_BATCH_SIZE: usize = 10;

/// Maximum number of dates fetched concurrently.
pub const CONCURRENT_TASKS: usize = 8;

// ── Record writer ─────────────────────────────────────────────────────────────

/// Rows buffered before a batched insert is flushed to the store.
pub const RECORD_WRITER_BATCH_SIZE: usize = 1_000;

// ── Store ─────────────────────────────────────────────────────────────────────

/// Default connection pool size.
pub const STORE_DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default pool-acquire timeout before a caller gets `Unavailable`.
pub const STORE_ACQUIRE_TIMEOUT_SECS: u64 = 5;

// ── Sync orchestrator ─────────────────────────────────────────────────────────

/// How long a `run_sync_all` progress snapshot is retained after its
/// credential batch reaches a terminal phase.
pub const SYNC_ALL_PROGRESS_TTL_SECS: i64 = 5 * 60;

/// Interval at which the background reaper sweeps expired progress entries.
pub const SYNC_ALL_REAPER_INTERVAL_SECS: u64 = 60;

// ── Secret provider ───────────────────────────────────────────────────────────

/// Raw AEAD key length in bytes (ChaCha20-Poly1305, 256-bit key).
pub const SECRET_KEY_BYTES: usize = 32;

/// Nonce length in bytes (ChaCha20-Poly1305, 96-bit nonce).
pub const SECRET_NONCE_BYTES: usize = 12;

/// Number of trailing plaintext characters kept in a credential's
/// `short_hash` field for display purposes. Cosmetic only.
pub const SHORT_HASH_TAIL_CHARS: usize = 4;
