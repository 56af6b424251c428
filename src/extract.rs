//! Front-page extraction for targeted captures.
//!
//! For every capture the selector flagged, this stage obtains the
//! archived front page (from the raw snapshot cache when the download
//! stage already saved it, otherwise straight from the replay endpoint),
//! ranks its top articles with the publisher's scraper, pulls article
//! bodies near the same capture instant, and writes one JSON extract per
//! capture.
//!
//! Captures are processed sequentially; a capture that fails is logged
//! and skipped so one broken snapshot cannot sink a long run. Article
//! scraping stops after five successful bodies per front page — beyond
//! the fold the ranking signal degrades and the archive traffic is not
//! worth it.

use std::path::Path;

use futures::stream::{self, StreamExt};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, info, instrument, warn};

use crate::download::{snapshot_path, DownloadError, SnapshotFetcher};
use crate::models::{CaptureRecord, ExtractedArticle, FrontPageExtract, SelectionResult};
use crate::outputs::{json, OutputError};
use crate::scrapers::{self, PublisherScraper};

/// Successful article bodies to collect per front page.
const MAX_SCRAPED_ARTICLES: usize = 5;

/// Errors from the extraction stage.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The requested publisher has no registered scraper.
    #[error("no scraper registered for `{name}` (available: {available})")]
    UnknownPublisher { name: String, available: String },

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("snapshot cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Run a publisher's scraper over every targeted capture and write one
/// JSON extract per capture. Returns the number of captures extracted.
///
/// # Errors
///
/// [`ExtractError::UnknownPublisher`] before any work happens; per-capture
/// failures after that are logged and skipped, never fatal.
#[instrument(level = "info", skip(result, fetcher), fields(%publisher, targets = result.target_count()))]
pub async fn extract_targets(
    result: &SelectionResult,
    publisher: &str,
    fetcher: &SnapshotFetcher,
    out_dir: &Path,
) -> Result<usize, ExtractError> {
    let Some(scraper) = scrapers::lookup(publisher) else {
        return Err(ExtractError::UnknownPublisher {
            name: publisher.to_string(),
            available: scrapers::names().join(", "),
        });
    };

    let raw_dir = out_dir.join(publisher).join("raw");
    fs::create_dir_all(&raw_dir).await?;

    let outcomes: Vec<bool> = stream::iter(result.targets())
        .then(|record| {
            let raw_dir = raw_dir.clone();
            async move {
                match extract_one(record, publisher, scraper, fetcher, &raw_dir, out_dir).await {
                    Ok(true) => true,
                    Ok(false) => {
                        warn!(
                            timestamp = %record.raw_timestamp,
                            "Front page snapshot unavailable; skipping capture"
                        );
                        false
                    }
                    Err(e) => {
                        error!(
                            timestamp = %record.raw_timestamp,
                            error = %e,
                            "Extraction failed for capture"
                        );
                        false
                    }
                }
            }
        })
        .collect()
        .await;

    let extracted = outcomes.iter().filter(|ok| **ok).count();
    info!(
        extracted,
        skipped = outcomes.len() - extracted,
        "Extraction run complete"
    );
    Ok(extracted)
}

async fn extract_one(
    record: &CaptureRecord,
    publisher: &str,
    scraper: &dyn PublisherScraper,
    fetcher: &SnapshotFetcher,
    raw_dir: &Path,
    out_dir: &Path,
) -> Result<bool, ExtractError> {
    let Some(front_page) = front_page_html(record, scraper.front_page_url(), fetcher, raw_dir).await?
    else {
        return Ok(false);
    };

    let top_articles = scraper.top_article_metadata(&front_page);
    debug!(
        timestamp = %record.raw_timestamp,
        count = top_articles.len(),
        "Ranked top articles"
    );

    let mut articles = Vec::with_capacity(top_articles.len());
    let mut scraped = 0usize;
    for top in top_articles {
        let scrape = if scraped < MAX_SCRAPED_ARTICLES {
            let article_url = fetcher.replay_url(&record.raw_timestamp, &top.url);
            match fetcher.fetch_html(&article_url).await {
                Ok(Some(html)) => {
                    let scrape = scraper.scrape_article(&html, &top.url);
                    if scrape.is_some() {
                        scraped += 1;
                    }
                    scrape
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(url = %top.url, error = %e, "Article fetch failed; keeping metadata only");
                    None
                }
            }
        } else {
            None
        };
        articles.push(ExtractedArticle {
            rank: top.rank,
            url: top.url,
            headline: top.headline,
            scrape,
        });
    }

    let extract = FrontPageExtract {
        publisher: publisher.to_string(),
        capture_timestamp: record.raw_timestamp.clone(),
        captured_at: record.timestamp,
        articles,
    };
    json::write_extract(&extract, out_dir).await?;
    Ok(true)
}

/// The archived front page for a capture: the snapshot cache if the
/// download stage saved it, the replay endpoint otherwise (caching the
/// result for the next stage or run).
async fn front_page_html(
    record: &CaptureRecord,
    front_page_url: &str,
    fetcher: &SnapshotFetcher,
    raw_dir: &Path,
) -> Result<Option<String>, ExtractError> {
    let path = snapshot_path(raw_dir, &record.raw_timestamp);
    if matches!(fs::try_exists(&path).await, Ok(true)) {
        debug!(path = %path.display(), "Using cached snapshot");
        return Ok(Some(fs::read_to_string(&path).await?));
    }

    let url = fetcher.raw_replay_url(&record.raw_timestamp, front_page_url);
    match fetcher.fetch_html(&url).await? {
        Some(html) => {
            fs::write(&path, &html).await?;
            Ok(Some(html))
        }
        None => Ok(None),
    }
}
