//! Snapshot selection: nearest-at-or-after matching of captures to
//! reference timestamps.
//!
//! Given the normalized captures for a URL and a sequence of reference
//! instants from a sampling policy, [`select`] flags the captures that
//! best satisfy the policy. The matching rule is nearest-at-or-after:
//! each reference resolves to the earliest capture no earlier than
//! itself, and never to one before it.
//!
//! The sweep keeps a monotonically advancing lower bound into the sorted
//! capture timestamps. Because references are processed in increasing
//! order, a capture dropped below the bound can never match a later
//! reference, which turns an O(R × N) nearest-search into O(N + R) after
//! sorting. References are sorted internally so callers may hand the
//! sequence over in any order.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::{debug, info};

use crate::models::{CaptureSet, SelectedCapture, SelectionResult};

/// Flag the captures matched by a sequence of reference timestamps.
///
/// For each reference (taken ascending) the earliest capture with
/// `timestamp >= reference` becomes a target. References with no capture
/// at or after them are silently skipped. Sparse captures are expected to
/// absorb several references into one target.
///
/// Empty captures or an empty reference sequence produce a result with no
/// targets; neither is an error.
pub fn select(
    captures: CaptureSet,
    references: impl IntoIterator<Item = DateTime<Utc>>,
) -> SelectionResult {
    // Canonical working copy: capture instants, ascending. The set is
    // normalized on construction, the sort here keeps the algorithm
    // self-contained.
    let mut sorted: Vec<DateTime<Utc>> = captures.records().iter().map(|r| r.timestamp).collect();
    sorted.sort();

    // The monotonic sweep is only valid over ascending references.
    let mut refs: Vec<DateTime<Utc>> = references.into_iter().collect();
    refs.sort();

    if sorted.is_empty() || refs.is_empty() {
        info!(
            captures = sorted.len(),
            references = refs.len(),
            "Nothing to select; result carries no targets"
        );
    }

    let mut targets: Vec<DateTime<Utc>> = Vec::new();
    let mut lower = 0usize;
    for reference in refs {
        // Advance the working view to the first capture >= reference.
        // Everything before it is dropped for good.
        while lower < sorted.len() && sorted[lower] < reference {
            lower += 1;
        }
        if lower == sorted.len() {
            // No capture at or after this reference (or any later one).
            break;
        }
        targets.push(sorted[lower]);
    }
    // Consecutive references can resolve to the same capture; the target
    // set absorbs the duplicates.
    targets.dedup();

    debug!(
        captures = sorted.len(),
        targets = targets.len(),
        "Selection sweep complete"
    );

    let rows = captures
        .into_records()
        .into_iter()
        .map(|record| {
            let is_target = targets.binary_search(&record.timestamp).is_ok();
            SelectedCapture { record, is_target }
        })
        .unique_by(|s| s.record.timestamp)
        .collect();

    SelectionResult::new(rows)
}
