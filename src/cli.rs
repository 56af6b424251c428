//! Command-line interface definitions for Frontpage Scan.
//!
//! This module defines the CLI arguments and options using the `clap`
//! crate, plus the publisher shortname → archive hostname mapping. The
//! scan target is either a publisher shortname (`-p nytimes`) or a bare
//! hostname/path (`-u www.nytimes.com`); the sampling cadence is either a
//! fixed interval in hours (`-i 6`) or one or more times of day
//! (`-a 09:00 18:00-05:00`).

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// Publishers whose front page does not live at `www.{name}.com`.
const URL_EXCEPTIONS: [(&str, &str); 4] = [
    ("abcnews", "www.abcnews.go.com"),
    ("npr", "www.npr.org"),
    ("pbs", "www.pbs.org/newshour"),
    ("bbc", "www.bbc.com/news"),
];

/// Command-line arguments for the Frontpage Scan application.
///
/// # Examples
///
/// ```sh
/// # Hourly sampling of the NYT front page over 2020, to a TSV file
/// frontpage_scan -p nytimes -s 2020-01-01 -e 2020-12-31 -i 1 captures.tsv
///
/// # Daily 9am and 6pm Eastern samples, downloading the raw snapshots
/// frontpage_scan -p washingtonpost -s 2020-06-01 -e 2020-06-30 \
///     -a 09:00-05:00 18:00-05:00 --download-dir ./wayback
///
/// # Full capture dump for an arbitrary URL, no sampling
/// frontpage_scan -u www.pbs.org/newshour all_captures.tsv
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(group(ArgGroup::new("target").required(true).args(["publisher", "url"])))]
#[command(group(ArgGroup::new("cadence").args(["interval", "at"])))]
pub struct Cli {
    /// Publisher shortname, resolved to its front-page host (e.g. "nytimes" -> www.nytimes.com)
    #[arg(short, long)]
    pub publisher: Option<String>,

    /// Bare hostname/path to scan instead of a publisher shortname
    #[arg(short, long)]
    pub url: Option<String>,

    /// Start of the sampling period (RFC 3339, YYYY-MM-DD, or YYYYMMDDhhmmss)
    #[arg(short, long)]
    pub start: Option<String>,

    /// End of the sampling period
    #[arg(short, long)]
    pub end: Option<String>,

    /// Sample every N hours (fractions allowed), aligned to the top of the hour
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Sample daily at these times of day (e.g. 09:00 18:30-05:00)
    #[arg(short = 'a', long, num_args = 1.., value_name = "TIME")]
    pub at: Option<Vec<String>>,

    /// Default UTC offset applied to naive dates and times (Z, +HH:MM, or -HH:MM)
    #[arg(short = 'z', long, default_value = "Z")]
    pub timezone: String,

    /// Keep captures whose status code is not 200
    #[arg(short = 'f', long)]
    pub all_statuses: bool,

    /// Download the raw HTML of every targeted snapshot into this directory
    #[arg(short = 'd', long)]
    pub download_dir: Option<PathBuf>,

    /// Run the publisher's scraper over targeted snapshots and write JSON extracts
    #[arg(long, requires = "publisher", requires = "download_dir")]
    pub scrape: bool,

    /// POST a one-line completion message to this URL when a download run finishes
    #[arg(long)]
    pub notify_url: Option<String>,

    /// Output file for the TSV table (stdout when omitted)
    pub outfile: Option<PathBuf>,
}

impl Cli {
    /// The hostname/path the capture index should be queried for.
    pub fn target_url(&self) -> String {
        match (&self.url, &self.publisher) {
            (Some(url), _) => url.clone(),
            (None, Some(publisher)) => publisher_host(publisher),
            // clap's target group guarantees one of the two is present.
            (None, None) => unreachable!("clap requires a publisher or a url"),
        }
    }

    /// Short publisher code used for output directory names.
    pub fn pubcode(&self) -> String {
        if let Some(publisher) = &self.publisher {
            return publisher.clone();
        }
        let url = self.url.as_deref().unwrap_or_default();
        let host = url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let host = host.split('/').next().unwrap_or(host);
        let host = host.strip_prefix("www.").unwrap_or(host);
        match host.split('.').next() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => "site".to_string(),
        }
    }
}

/// Map a publisher shortname onto its archive hostname.
pub fn publisher_host(name: &str) -> String {
    URL_EXCEPTIONS
        .iter()
        .find(|(short, _)| *short == name)
        .map(|(_, host)| host.to_string())
        .unwrap_or_else(|| format!("www.{name}.com"))
}
