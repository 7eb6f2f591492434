use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Opaque identifier for a stored partner credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialId(pub Uuid);

impl CredentialId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CredentialId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CredentialId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(CredentialId)
            .map_err(|_| CoreError::BadInput(format!("invalid credential id: {s}")))
    }
}

/// Opaque identifier for one `run_sync`/`run_sync_all` invocation, used to
/// correlate progress snapshots with a client's request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncId(pub Uuid);

impl SyncId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SyncId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SyncId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SyncId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(SyncId)
            .map_err(|_| CoreError::BadInput(format!("invalid sync id: {s}")))
    }
}

/// Opaque remote cursor: "data through this point has been delivered to
/// you." Not a date — the partner API assigns these and the client only
/// ever compares or forwards them, never interprets their magnitude.
pub type Highwatermark = i64;

/// A calendar day as tracked by the sync engine, distinct from any
/// particular timestamp within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DateKey(pub NaiveDate);

impl DateKey {
    pub fn today() -> Self {
        Self(chrono::Utc::now().date_naive())
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl FromStr for DateKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(DateKey)
            .map_err(|_| CoreError::BadInput(format!("invalid date: {s}")))
    }
}

/// A non-negative integer identifier for a remote lookup entity (app,
/// package, bundle, partner, discount). The remote API hands these back as
/// bare integers; we never interpret them beyond equality and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(pub i64);

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 3166-1 alpha-2 country code, stored and compared upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(pub String);

impl CountryCode {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_ascii_uppercase())
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A signed money amount in integer cents. The remote API sends prices and
/// revenue as decimal strings; all such values are converted to `Cents`
/// immediately on ingest and never handled as floating point again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(pub i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    /// Parse a decimal string like `"19.99"` or `"-0.50"` into integer
    /// cents, rounding half-away-from-zero. Returns `None` for a blank or
    /// unparsable string so callers can distinguish "absent" from "zero".
    pub fn parse_decimal(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let value: f64 = trimmed.parse().ok()?;
        Some(Cents((value * 100.0).round() as i64))
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, (self.0 % 100).abs())
    }
}
