//! Data models for archive captures, selections, and extracted articles.
//!
//! This module defines the core data structures used throughout the
//! application:
//! - [`CaptureRecord`]: one archived snapshot as indexed by the capture index
//! - [`CaptureSet`]: the normalized (sorted, deduplicated) captures for one query
//! - [`SelectionResult`] / [`SelectedCapture`]: captures with sampling flags
//! - Extraction types: [`TopArticle`], [`ArticleScrape`], [`FrontPageExtract`]
//!
//! Capture records are immutable once fetched; a record belongs to its
//! capture set for the duration of one query and has no identity across
//! queries.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// One archived snapshot of a URL, as returned by the capture index.
///
/// `timestamp` is the normalized UTC instant; `raw_timestamp` keeps the
/// wire-format 14-digit string verbatim because replay URLs and on-disk
/// snapshot filenames are keyed by it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub urlkey: String,
    pub timestamp: DateTime<Utc>,
    pub raw_timestamp: String,
    pub original: String,
    pub mimetype: String,
    pub statuscode: String,
    pub digest: String,
    pub length: String,
}

/// The ordered captures for one (URL, time range) query.
///
/// Construction normalizes: records are stably sorted ascending by
/// timestamp, then deduplicated by timestamp with the first occurrence
/// winning. After that no two records share a timestamp and order is
/// non-decreasing.
#[derive(Debug, Clone, Default)]
pub struct CaptureSet {
    records: Vec<CaptureRecord>,
}

impl CaptureSet {
    /// Build a normalized capture set from raw records.
    pub fn from_records(mut records: Vec<CaptureRecord>) -> Self {
        records.sort_by_key(|r| r.timestamp);
        let records = records
            .into_iter()
            .unique_by(|r| r.timestamp)
            .collect::<Vec<CaptureRecord>>();
        Self { records }
    }

    pub fn records(&self) -> &[CaptureRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CaptureRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest capture instant, if any. Used to default an absent
    /// period-start bound.
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records.first().map(|r| r.timestamp)
    }

    /// Latest capture instant, if any. Used to default an absent
    /// period-end bound.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.records.last().map(|r| r.timestamp)
    }
}

/// A capture row paired with its sampling outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedCapture {
    #[serde(flatten)]
    pub record: CaptureRecord,
    /// True iff this capture is the nearest-at-or-after match for at least
    /// one reference timestamp.
    pub is_target: bool,
}

/// The output of the snapshot selector: every capture row, flagged.
///
/// Rows keep capture-set order (ascending by timestamp, deduplicated).
#[derive(Debug, Clone, Default)]
pub struct SelectionResult {
    rows: Vec<SelectedCapture>,
}

impl SelectionResult {
    pub fn new(rows: Vec<SelectedCapture>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[SelectedCapture] {
        &self.rows
    }

    /// The flagged captures only, in timestamp order.
    pub fn targets(&self) -> impl Iterator<Item = &CaptureRecord> {
        self.rows.iter().filter(|s| s.is_target).map(|s| &s.record)
    }

    pub fn target_count(&self) -> usize {
        self.rows.iter().filter(|s| s.is_target).count()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One ranked headline lifted from an archived front page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopArticle {
    /// 1-based prominence rank on the front page.
    pub rank: usize,
    /// The href exactly as it appeared in the archived HTML.
    pub href: String,
    /// The cleaned live-site URL (replay prefixes stripped, params removed).
    pub url: String,
    pub headline: String,
}

/// A scraped article body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleScrape {
    pub title: String,
    pub paragraphs: Vec<String>,
}

/// An article slot in a front-page extract; `scrape` is `None` when the
/// body could not be retrieved or parsed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedArticle {
    pub rank: usize,
    pub url: String,
    pub headline: String,
    pub scrape: Option<ArticleScrape>,
}

/// Everything extracted from one archived front page.
///
/// Serialized as one JSON document per capture timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontPageExtract {
    /// Registry name of the publisher scraper that produced this.
    pub publisher: String,
    /// The capture's 14-digit archive timestamp.
    pub capture_timestamp: String,
    /// The capture instant, normalized.
    pub captured_at: DateTime<Utc>,
    pub articles: Vec<ExtractedArticle>,
}

#[cfg(test)]
pub(crate) fn test_record(raw_timestamp: &str) -> CaptureRecord {
    use crate::timestamp::parse_wayback14;
    CaptureRecord {
        urlkey: "com,example)/".to_string(),
        timestamp: parse_wayback14(raw_timestamp).unwrap(),
        raw_timestamp: raw_timestamp.to_string(),
        original: "https://www.example.com/".to_string(),
        mimetype: "text/html".to_string(),
        statuscode: "200".to_string(),
        digest: "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string(),
        length: "1024".to_string(),
    }
}
