//! Raw snapshot downloading for targeted captures.
//!
//! Once the selector has flagged captures, this module pulls each one's
//! unmodified HTML from the archive's replay endpoint and lays it out on
//! disk as `{dir}/{pubcode}/raw/{TS}.html`. Runs are resumable: a file
//! that already exists is skipped, so an interrupted download picks up
//! where it left off.
//!
//! Fetches are sequential — the archive rate-limits aggressively and the
//! run's throughput is bounded remotely, not locally. Transient failures
//! back off exponentially up to a ceiling of attempts; a snapshot that
//! exhausts the ceiling is logged and skipped without failing the batch.
//! Redirect loops (the archive's answer for some captures that no longer
//! resolve) are skipped immediately rather than retried.

use std::path::{Path, PathBuf};
use std::time::{Duration as StdDuration, Instant};

use rand::Rng;
use thiserror::Error;
use tokio::fs;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::cdx::USER_AGENT;
use crate::models::SelectionResult;

/// Default replay endpoint for snapshot bodies.
pub const DEFAULT_REPLAY_ENDPOINT: &str = "https://web.archive.org/web";

/// Errors from the snapshot download boundary.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The HTTP round trip failed after the retry ceiling.
    #[error("snapshot request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The snapshot could not be written to disk.
    #[error("could not write snapshot to disk: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome counts for one download run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    pub skipped_existing: usize,
    pub failed: usize,
}

/// Fetches snapshot bodies from the archive's replay endpoint with
/// bounded exponential backoff.
#[derive(Debug, Clone)]
pub struct SnapshotFetcher {
    http: reqwest::Client,
    replay_endpoint: String,
    max_retries: usize,
    max_backoff: StdDuration,
}

impl SnapshotFetcher {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            replay_endpoint: DEFAULT_REPLAY_ENDPOINT.to_string(),
            max_retries: 10,
            max_backoff: StdDuration::from_secs(32),
        }
    }

    /// Point the fetcher at a different replay endpoint (mirrors, tests).
    pub fn with_endpoint(replay_endpoint: impl Into<String>) -> Self {
        Self {
            replay_endpoint: replay_endpoint.into(),
            ..Self::new()
        }
    }

    /// Replay URL for the unmodified original body of a capture.
    ///
    /// The `id_` flag asks the archive for the HTML exactly as captured,
    /// without the replay banner or rewritten links.
    pub fn raw_replay_url(&self, raw_timestamp: &str, target: &str) -> String {
        format!(
            "{}/{}id_/{}",
            self.replay_endpoint,
            raw_timestamp,
            ensure_scheme(target)
        )
    }

    /// Replay URL for the rewritten (navigable) rendering of a capture.
    ///
    /// Article-body fetches use this form; in-page links come back with
    /// archive prefixes, which the scrapers strip.
    pub fn replay_url(&self, raw_timestamp: &str, target: &str) -> String {
        format!(
            "{}/{}/{}",
            self.replay_endpoint,
            raw_timestamp,
            ensure_scheme(target)
        )
    }

    /// Fetch one snapshot body.
    ///
    /// Returns `Ok(None)` when the archive answers with a redirect loop —
    /// that capture is unservable and retrying cannot help. Other
    /// failures retry with exponential backoff; exhausting the ceiling
    /// returns the last error.
    #[instrument(level = "info", skip(self), fields(%url))]
    pub async fn fetch_html(&self, url: &str) -> Result<Option<String>, DownloadError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let outcome = self
                .http
                .get(url)
                .header(reqwest::header::USER_AGENT, USER_AGENT)
                .send()
                .await;
            let outcome = match outcome {
                Ok(response) => response.text().await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(body) => {
                    debug!(
                        bytes = body.len(),
                        elapsed_ms = total_t0.elapsed().as_millis() as u128,
                        "Fetched snapshot body"
                    );
                    return Ok(Some(body));
                }
                Err(e) if e.is_redirect() => {
                    warn!(error = %e, "Snapshot is stuck in a redirect loop; skipping");
                    return Ok(None);
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                            error = %e,
                            "snapshot fetch exhausted retries"
                        );
                        return Err(e.into());
                    }

                    let mut delay = StdDuration::from_secs(1).saturating_mul(1 << (attempt - 1));
                    if delay > self.max_backoff {
                        delay = self.max_backoff;
                    }
                    let jitter_ms: u64 = rand::rng().random_range(0..=999);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "snapshot fetch failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }

    /// Download every targeted capture's raw HTML under
    /// `{out_dir}/{pubcode}/raw/`, skipping files that already exist.
    ///
    /// Individual failures are logged and counted, never fatal; only an
    /// unusable output directory aborts the run.
    #[instrument(level = "info", skip(self, result), fields(%pubcode, targets = result.target_count()))]
    pub async fn download_targets(
        &self,
        result: &SelectionResult,
        target_url: &str,
        pubcode: &str,
        out_dir: &Path,
    ) -> Result<DownloadSummary, DownloadError> {
        let raw_dir = out_dir.join(pubcode).join("raw");
        fs::create_dir_all(&raw_dir).await?;

        let mut summary = DownloadSummary::default();
        for record in result.targets() {
            let path = snapshot_path(&raw_dir, &record.raw_timestamp);
            if matches!(fs::try_exists(&path).await, Ok(true)) {
                summary.skipped_existing += 1;
                debug!(timestamp = %record.raw_timestamp, "Snapshot already on disk; skipping");
                continue;
            }

            let url = self.raw_replay_url(&record.raw_timestamp, target_url);
            match self.fetch_html(&url).await {
                Ok(Some(html)) => {
                    fs::write(&path, html).await?;
                    summary.downloaded += 1;
                    info!(timestamp = %record.raw_timestamp, path = %path.display(), "Saved snapshot");
                }
                Ok(None) => {
                    summary.failed += 1;
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(timestamp = %record.raw_timestamp, error = %e, "Giving up on snapshot");
                }
            }
        }

        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped_existing,
            failed = summary.failed,
            "Download run complete"
        );
        Ok(summary)
    }
}

impl Default for SnapshotFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk location of one snapshot inside a publisher's `raw/` directory.
pub fn snapshot_path(raw_dir: &Path, raw_timestamp: &str) -> PathBuf {
    raw_dir.join(format!("{raw_timestamp}.html"))
}

fn ensure_scheme(target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        target.to_string()
    } else {
        format!("https://{target}")
    }
}

/// POST a one-line completion message to a notify endpoint.
///
/// Best effort: failures are logged and swallowed so a flaky notifier
/// can't fail a finished run.
#[instrument(level = "info", skip_all, fields(%notify_url))]
pub async fn notify_completion(notify_url: &str, message: &str) {
    let client = reqwest::Client::new();
    let outcome = client
        .post(notify_url)
        .header("Tags", "newspaper")
        .body(message.to_string())
        .send()
        .await;
    match outcome {
        Ok(_) => info!("Posted completion notification"),
        Err(e) => warn!(error = %e, "Completion notification failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_replay_url() {
        let fetcher = SnapshotFetcher::new();
        assert_eq!(
            fetcher.raw_replay_url("20200101090000", "www.nytimes.com"),
            "https://web.archive.org/web/20200101090000id_/https://www.nytimes.com"
        );
    }

    #[test]
    fn test_replay_url_keeps_existing_scheme() {
        let fetcher = SnapshotFetcher::new();
        assert_eq!(
            fetcher.replay_url("20200101090000", "https://www.cnn.com/story.html"),
            "https://web.archive.org/web/20200101090000/https://www.cnn.com/story.html"
        );
    }

    #[test]
    fn test_with_endpoint() {
        let fetcher = SnapshotFetcher::with_endpoint("http://127.0.0.1:8080/web");
        assert_eq!(
            fetcher.raw_replay_url("20200101090000", "www.example.com"),
            "http://127.0.0.1:8080/web/20200101090000id_/https://www.example.com"
        );
    }

    #[test]
    fn test_snapshot_path() {
        let path = snapshot_path(Path::new("/data/nytimes/raw"), "20200101090000");
        assert_eq!(path, PathBuf::from("/data/nytimes/raw/20200101090000.html"));
    }
}
