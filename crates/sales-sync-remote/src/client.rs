use std::time::Duration;

use reqwest::StatusCode;
use sales_sync_core::constants::{
    REMOTE_ATTEMPT_TIMEOUT_SECS, REMOTE_MAX_RETRIES, RETRYABLE_STATUS_CODES,
};
use sales_sync_core::types::Cents;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::RemoteError;
use crate::types::{ChangedDatesResponse, DetailedSalesResponse};

const USER_AGENT: &str = concat!("sales-sync/", env!("CARGO_PKG_VERSION"));

/// Every partner API response is wrapped in a top-level `response` object.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    response: T,
}

/// Typed client for the partner's sales API. Every request carries its own
/// timeout, is retried with exponential backoff on transient failures, and
/// checks `cancel` before each attempt so a paused sync doesn't burn
/// another round trip before stopping.
pub struct RemoteClient {
    base_url: String,
    http: reqwest::Client,
}

impl RemoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("reqwest client builds with default TLS backend");
        Self {
            base_url: base_url.into(),
            http,
        }
    }

    pub async fn changed_dates(
        &self,
        api_key: &str,
        highwatermark: i64,
        cancel: &CancellationToken,
    ) -> Result<ChangedDatesResponse, RemoteError> {
        let url = format!("{}/GetChangedDatesForPartner/v1", self.base_url);
        let highwatermark = highwatermark.to_string();
        let envelope: Envelope<ChangedDatesResponse> = self
            .get_with_retry(&url, &[("key", api_key), ("highwatermark", &highwatermark)], cancel)
            .await?;
        Ok(envelope.response)
    }

    pub async fn detailed_sales(
        &self,
        api_key: &str,
        date: &str,
        highwatermark_id: i64,
        cancel: &CancellationToken,
    ) -> Result<DetailedSalesResponse, RemoteError> {
        let url = format!("{}/GetDetailedSales/v1", self.base_url);
        let cursor = highwatermark_id.to_string();
        let envelope: Envelope<DetailedSalesResponse> = self
            .get_with_retry(
                &url,
                &[("key", api_key), ("date", date), ("highwatermark_id", &cursor)],
                cancel,
            )
            .await?;
        Ok(envelope.response)
    }

    async fn get_with_retry<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T, RemoteError> {
        // `attempts_made` counts attempts already completed, starting at 0.
        // `REMOTE_MAX_RETRIES` caps the *total* attempts (spec: "up to
        // maxRetries = 3 total attempts"), so retrying stops once
        // `attempts_made` reaches it. Backoff before the Nth retry is
        // `2^(N-1)` seconds: 1s, 2s, 4s, ...
        let mut attempts_made = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(RemoteError::Cancelled);
            }

            let started = std::time::Instant::now();
            let result = self.one_attempt::<T>(url, query, cancel).await;
            let elapsed = started.elapsed();
            attempts_made += 1;

            match result {
                Ok(value) => {
                    debug!(url, attempts_made, ?elapsed, "remote request succeeded");
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempts_made < REMOTE_MAX_RETRIES => {
                    let backoff = Duration::from_secs(2u64.pow(attempts_made - 1));
                    warn!(url, attempts_made, ?elapsed, ?backoff, error = %err, "retrying remote request");
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn one_attempt<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<T, RemoteError> {
        let request = self
            .http
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json")
            .timeout(Duration::from_secs(REMOTE_ATTEMPT_TIMEOUT_SECS))
            .send();

        // The per-attempt deadline and the caller's cancellation token race
        // each other; whichever fires first cancels the in-flight request.
        let response = tokio::select! {
            result = request => result?,
            _ = cancel.cancelled() => return Err(RemoteError::Cancelled),
        };

        let status = response.status();
        if !status.is_success() {
            let retryable = is_retryable_status(status);
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
                retryable,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::Parse(e.to_string()))
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status.as_u16()) || status.is_server_error()
}

/// Parse a decimal revenue string into integer cents, rounding
/// half-away-from-zero. Unparseable or absent revenue becomes zero —
/// revenue fields are always "present" conceptually, just sometimes
/// un-parseable garbage from the remote.
pub fn parse_revenue_cents(raw: &Option<String>) -> Cents {
    raw.as_deref()
        .and_then(Cents::parse_decimal)
        .unwrap_or(Cents::ZERO)
}

/// Parse a decimal price string into integer cents, preserving the
/// distinction between "the remote reported no price" (`None`) and "the
/// remote reported a genuine zero price" (`Some(Cents(0))`).
pub fn parse_price_cents(raw: &Option<String>) -> Option<Cents> {
    raw.as_deref().and_then(Cents::parse_decimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_statuses_include_429_408_and_5xx() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn revenue_defaults_to_zero_on_garbage_or_absence() {
        assert_eq!(parse_revenue_cents(&None), Cents(0));
        assert_eq!(parse_revenue_cents(&Some(String::new())), Cents(0));
        assert_eq!(parse_revenue_cents(&Some("not a number".into())), Cents(0));
        assert_eq!(parse_revenue_cents(&Some("19.99".into())), Cents(1999));
    }

    #[test]
    fn price_distinguishes_absent_from_zero() {
        assert_eq!(parse_price_cents(&None), None);
        assert_eq!(parse_price_cents(&Some("0.00".into())), Some(Cents(0)));
        assert_eq!(parse_price_cents(&Some("19.99".into())), Some(Cents(1999)));
    }
}
