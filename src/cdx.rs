//! Capture index client with exponential backoff retry logic.
//!
//! The Wayback Machine's CDX endpoint answers `url=…&output=json` queries
//! with a JSON array of arrays: the first row is a column header, every
//! following row is one capture. This module turns that wire shape into a
//! normalized [`CaptureSet`], dropping malformed rows with a warning
//! instead of letting them poison the sort order downstream.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`FetchRows`]: core trait for one fetch-and-decode round trip
//! - [`HttpFetch`]: the `reqwest`-backed implementation
//! - [`RetryFetch`]: decorator that adds retry logic to any [`FetchRows`]
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//!
//! Network failures and undecodable bodies are both transient here (the
//! archive intermittently serves error pages); exhausting the ceiling
//! surfaces the last error to the caller.

use std::fmt;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Utc};
use rand::Rng;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::models::{CaptureRecord, CaptureSet};
use crate::timestamp::{format_wayback14, parse_wayback14};

/// Default capture index endpoint.
pub const DEFAULT_CDX_ENDPOINT: &str = "https://web.archive.org/cdx/search/cdx";

/// User-Agent sent on every archive request.
pub const USER_AGENT: &str = concat!(
    "frontpage_scan/",
    env!("CARGO_PKG_VERSION"),
    " (https://github.com/graves/frontpage_scan)"
);

/// Errors from the capture index boundary.
#[derive(Debug, Error)]
pub enum CdxError {
    /// The HTTP round trip failed (connect, timeout, non-success body read).
    #[error("capture index request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body was not the expected JSON array of arrays.
    #[error("capture index returned an undecodable body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The header row lacks a column the selector depends on.
    #[error("capture index response is missing required column `{0}`")]
    MissingColumn(&'static str),

    /// The configured endpoint could not be parsed as a URL.
    #[error("capture index endpoint is not a valid URL: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// One fetch-and-decode round trip against the capture index.
///
/// Decoding lives inside the trait so the retry decorator covers both
/// network and decode failures.
pub trait FetchRows {
    async fn fetch(&self, request: &Url) -> Result<Vec<Vec<String>>, CdxError>;
}

/// `reqwest`-backed [`FetchRows`] implementation.
#[derive(Debug)]
pub struct HttpFetch {
    http: reqwest::Client,
}

impl HttpFetch {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetch {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchRows for HttpFetch {
    #[instrument(level = "info", skip_all, fields(url = %request))]
    async fn fetch(&self, request: &Url) -> Result<Vec<Vec<String>>, CdxError> {
        let t0 = Instant::now();
        let body = self
            .http
            .get(request.clone())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await?
            .text()
            .await?;
        let rows: Vec<Vec<String>> = serde_json::from_str(&body)?;
        debug!(
            elapsed_ms = t0.elapsed().as_millis() as u128,
            rows = rows.len(),
            "Fetched capture index rows"
        );
        Ok(rows)
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`FetchRows`]
/// implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: FetchRows,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> FetchRows for RetryFetch<T>
where
    T: FetchRows + fmt::Debug,
{
    #[instrument(level = "info", skip_all)]
    async fn fetch(&self, request: &Url) -> Result<Vec<Vec<String>>, CdxError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch(request).await {
                Ok(rows) => {
                    return Ok(rows);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "capture index fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rand::rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "capture index fetch failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Client for querying a URL's capture history.
#[derive(Debug, Clone)]
pub struct CdxClient {
    endpoint: String,
    max_retries: usize,
    base_delay: StdDuration,
}

impl CdxClient {
    pub fn new() -> Self {
        Self {
            endpoint: DEFAULT_CDX_ENDPOINT.to_string(),
            max_retries: 5,
            base_delay: StdDuration::from_secs(1),
        }
    }

    /// Point the client at a different index endpoint (mirrors, tests).
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::new()
        }
    }

    fn request_url(
        &self,
        url: &str,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> Result<Url, CdxError> {
        let mut request = Url::parse(&self.endpoint)?;
        {
            let mut pairs = request.query_pairs_mut();
            pairs.append_pair("url", url);
            pairs.append_pair("output", "json");
            if let Some(start) = period_start {
                pairs.append_pair("from", &format_wayback14(start));
            }
            if let Some(end) = period_end {
                pairs.append_pair("to", &format_wayback14(end));
            }
        }
        Ok(request)
    }

    /// Fetch the capture history of `url`, optionally bounded and filtered
    /// to successful captures.
    ///
    /// Timestamps are normalized to UTC instants before the set is built;
    /// rows whose timestamp fails the strict 14-digit parse are dropped
    /// with a warning. Zero rows is not an error.
    ///
    /// # Errors
    ///
    /// [`CdxError`] after the retry ceiling is exhausted, or for a
    /// malformed endpoint / missing response column.
    #[instrument(level = "info", skip(self), fields(%url))]
    pub async fn query(
        &self,
        url: &str,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
        only_ok: bool,
    ) -> Result<CaptureSet, CdxError> {
        let request = self.request_url(url, period_start, period_end)?;
        let fetcher = RetryFetch::new(HttpFetch::new(), self.max_retries, self.base_delay);
        let rows = fetcher.fetch(&request).await?;

        let records = parse_rows(rows, only_ok)?;
        if records.is_empty() {
            info!(%url, "Capture index returned no usable captures");
        } else {
            info!(%url, count = records.len(), "Fetched capture history");
        }
        Ok(CaptureSet::from_records(records))
    }
}

impl Default for CdxClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode the JSON array-of-arrays shape into capture records.
///
/// The first row names the columns; `timestamp`, `original`, and
/// `statuscode` must be present, the rest default to empty strings.
fn parse_rows(rows: Vec<Vec<String>>, only_ok: bool) -> Result<Vec<CaptureRecord>, CdxError> {
    let mut iter = rows.into_iter();
    let Some(header) = iter.next() else {
        return Ok(Vec::new());
    };

    let column = |name: &'static str| -> Result<usize, CdxError> {
        header
            .iter()
            .position(|h| h == name)
            .ok_or(CdxError::MissingColumn(name))
    };
    let optional = |name: &str| -> Option<usize> { header.iter().position(|h| h == name) };

    let ts_col = column("timestamp")?;
    let original_col = column("original")?;
    let status_col = column("statuscode")?;
    let urlkey_col = optional("urlkey");
    let mime_col = optional("mimetype");
    let digest_col = optional("digest");
    let length_col = optional("length");

    let field = |row: &[String], col: Option<usize>| -> String {
        col.and_then(|i| row.get(i).cloned()).unwrap_or_default()
    };

    let mut records = Vec::new();
    let mut dropped = 0usize;
    for row in iter {
        let raw_timestamp = match row.get(ts_col) {
            Some(raw) => raw.clone(),
            None => {
                dropped += 1;
                warn!(?row, "Dropping capture row with no timestamp field");
                continue;
            }
        };
        let timestamp = match parse_wayback14(&raw_timestamp) {
            Ok(t) => t,
            Err(e) => {
                dropped += 1;
                warn!(error = %e, "Dropping capture with malformed timestamp");
                continue;
            }
        };
        let statuscode = field(&row, Some(status_col));
        if only_ok && statuscode != "200" {
            continue;
        }
        records.push(CaptureRecord {
            urlkey: field(&row, urlkey_col),
            timestamp,
            raw_timestamp,
            original: field(&row, Some(original_col)),
            mimetype: field(&row, mime_col),
            statuscode,
            digest: field(&row, digest_col),
            length: field(&row, length_col),
        });
    }

    if dropped > 0 {
        warn!(dropped, "Dropped capture rows during normalization");
    }
    Ok(records)
}
