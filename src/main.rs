//! # Frontpage Scan
//!
//! A pipeline that samples a news publisher's archived front pages from
//! the Wayback Machine at a chosen cadence, downloads the selected
//! snapshots, and extracts structured top-article metadata from them.
//!
//! ## Features
//!
//! - Queries the archive's capture index (CDX) for a URL's full or
//!   bounded capture history
//! - Samples captures at a fixed interval or at fixed times of day,
//!   matching each reference instant to the earliest capture at or after
//!   it
//! - Writes the capture table or the targeted selection as TSV
//! - Optionally downloads each targeted snapshot's raw HTML (resumable)
//! - Optionally runs a per-publisher scraper over each downloaded front
//!   page and writes one JSON extract per capture
//!
//! ## Usage
//!
//! ```sh
//! frontpage_scan -p nytimes -s 2020-01-01 -e 2020-12-31 -i 1 captures.tsv
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Query**: Fetch the capture history for the target URL
//! 2. **Sampling**: Generate reference timestamps from the cadence policy
//! 3. **Selection**: Flag the nearest-at-or-after capture per reference
//! 4. **Output**: Write the TSV table; optionally download snapshots and
//!    extract front-page metadata

use std::error::Error;
use std::io;
use std::path::Path;

use chrono::{DateTime, FixedOffset, Utc};
use clap::Parser;
use tracing::{debug, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cdx;
mod cli;
mod download;
mod extract;
mod models;
mod outputs;
mod sampling;
mod scrapers;
mod selector;
mod timestamp;

use cdx::CdxClient;
use cli::Cli;
use download::{notify_completion, SnapshotFetcher};
use models::SelectionResult;
use outputs::{tsv, OutputError};
use sampling::{SamplingPolicy, TimeOfDay};
use selector::select;
use timestamp::{parse_datetime, parse_offset};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("frontpage_scan starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let default_offset = parse_offset(&args.timezone)?;
    let target_url = args.target_url();
    info!(%target_url, timezone = %args.timezone, "Resolved scan target");

    let period_start = args
        .start
        .as_deref()
        .map(|s| parse_datetime(s, default_offset))
        .transpose()?;
    let period_end = args
        .end
        .as_deref()
        .map(|s| parse_datetime(s, default_offset))
        .transpose()?;

    // Build the sampling policy before any I/O so a bad cadence fails fast.
    let policy = build_policy(&args)?;

    // ---- Query the capture index ----
    let client = CdxClient::new();
    let captures = client
        .query(
            &target_url,
            period_start.map(|t| t.with_timezone(&Utc)),
            period_end.map(|t| t.with_timezone(&Utc)),
            !args.all_statuses,
        )
        .await?;
    info!(count = captures.len(), "Capture history fetched");

    // ---- No cadence: dump the full capture table and stop ----
    let Some(policy) = policy else {
        write_tsv(args.outfile.as_deref(), |w| tsv::write_captures(w, &captures))?;
        let elapsed = start_time.elapsed();
        info!(?elapsed, rows = captures.len(), "Execution complete");
        return Ok(());
    };

    // ---- Sampling + selection ----
    // Absent bounds fall back to the capture history's own extent, so an
    // unbounded scan samples everything the archive has.
    let start_bound = resolve_bound(period_start, captures.first_timestamp(), default_offset);
    let end_bound = resolve_bound(period_end, captures.last_timestamp(), default_offset);

    let result = match (start_bound, end_bound) {
        (Some(start), Some(end)) => {
            let references = policy.reference_times(start, end, default_offset)?;
            select(captures, references)
        }
        _ => {
            info!("No captures and no explicit bounds; nothing to sample");
            SelectionResult::default()
        }
    };
    info!(
        rows = result.len(),
        targets = result.target_count(),
        "Snapshot selection complete"
    );

    write_tsv(args.outfile.as_deref(), |w| tsv::write_targets(w, &result))?;

    // ---- Optional download + extraction stages ----
    if let Some(download_dir) = &args.download_dir {
        let fetcher = SnapshotFetcher::new();
        let pubcode = args.pubcode();

        let summary = fetcher
            .download_targets(&result, &target_url, &pubcode, download_dir)
            .await?;

        if args.scrape {
            let extracted =
                extract::extract_targets(&result, &pubcode, &fetcher, download_dir).await?;
            info!(extracted, "Front-page extraction complete");
        }

        if let Some(notify_url) = &args.notify_url {
            let message = format!(
                "Publisher {pubcode} has been retrieved from the Internet Archive: \
                 {} downloaded, {} already on disk, {} failed.",
                summary.downloaded, summary.skipped_existing, summary.failed
            );
            notify_completion(notify_url, &message).await;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Translate the CLI cadence flags into a sampling policy, if any.
fn build_policy(args: &Cli) -> Result<Option<SamplingPolicy>, Box<dyn Error>> {
    if let Some(hours) = args.interval {
        return Ok(Some(SamplingPolicy::FixedInterval { hours }));
    }
    if let Some(at) = &args.at {
        let times = at
            .iter()
            .map(|s| s.parse::<TimeOfDay>())
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Some(SamplingPolicy::FixedTimesOfDay { times }));
    }
    Ok(None)
}

/// An explicit period bound, or the capture history's own extent.
fn resolve_bound(
    explicit: Option<DateTime<FixedOffset>>,
    fallback: Option<DateTime<Utc>>,
    offset: FixedOffset,
) -> Option<DateTime<FixedOffset>> {
    explicit.or_else(|| fallback.map(|t| t.with_timezone(&offset)))
}

/// Write a TSV table to the chosen outfile, or stdout when none was given.
fn write_tsv(
    outfile: Option<&Path>,
    write: impl FnOnce(&mut dyn io::Write) -> Result<(), OutputError>,
) -> Result<(), OutputError> {
    match outfile {
        Some(path) => {
            let mut file = std::fs::File::create(path)?;
            write(&mut file)?;
            info!(path = %path.display(), "Wrote TSV output");
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)
        }
    }
}
