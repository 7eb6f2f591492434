use thiserror::Error;

/// Shared error taxonomy used wherever a crate boundary needs a stable,
/// client-facing classification rather than a raw downstream error type.
/// Crate-local errors (remote, store, sync) carry richer context and
/// convert into this one at their API surface.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input validation ─────────────────────────────────────────────────────
    #[error("bad input: {0}")]
    BadInput(String),

    // ── Lookup ───────────────────────────────────────────────────────────────
    #[error("not found: {0}")]
    NotFound(String),

    // ── Concurrency ──────────────────────────────────────────────────────────
    #[error("conflict: {0}")]
    Conflict(String),

    // ── Capacity / availability ──────────────────────────────────────────────
    #[error("unavailable: {0}")]
    Unavailable(String),

    // ── Cryptography ─────────────────────────────────────────────────────────
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    // ── Cancellation ─────────────────────────────────────────────────────────
    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}
