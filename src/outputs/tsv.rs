//! Tab-delimited output for capture tables and selection results.
//!
//! Two shapes, matching the two CLI modes:
//!
//! - No sampling policy: the full capture table, one row per capture,
//!   without a flag column
//! - A sampling policy ran: the targeted rows only, with the `is_target`
//!   column appended
//!
//! Rows carry the seven capture index columns as received (the
//! `timestamp` column stays in 14-digit wire form) plus an RFC 3339
//! `datetime` column with the normalized instant.

use std::io;

use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::models::{CaptureRecord, CaptureSet, SelectionResult};
use crate::outputs::OutputError;

#[derive(Debug, Serialize)]
struct CaptureRow<'a> {
    urlkey: &'a str,
    timestamp: &'a str,
    original: &'a str,
    mimetype: &'a str,
    statuscode: &'a str,
    digest: &'a str,
    length: &'a str,
    datetime: String,
}

impl<'a> From<&'a CaptureRecord> for CaptureRow<'a> {
    fn from(record: &'a CaptureRecord) -> Self {
        Self {
            urlkey: &record.urlkey,
            timestamp: &record.raw_timestamp,
            original: &record.original,
            mimetype: &record.mimetype,
            statuscode: &record.statuscode,
            digest: &record.digest,
            length: &record.length,
            datetime: record.timestamp.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TargetRow<'a> {
    urlkey: &'a str,
    timestamp: &'a str,
    original: &'a str,
    mimetype: &'a str,
    statuscode: &'a str,
    digest: &'a str,
    length: &'a str,
    datetime: String,
    is_target: bool,
}

impl<'a> TargetRow<'a> {
    fn new(record: &'a CaptureRecord, is_target: bool) -> Self {
        let base = CaptureRow::from(record);
        Self {
            urlkey: base.urlkey,
            timestamp: base.timestamp,
            original: base.original,
            mimetype: base.mimetype,
            statuscode: base.statuscode,
            digest: base.digest,
            length: base.length,
            datetime: base.datetime,
            is_target,
        }
    }
}

/// Write the full capture table, one row per capture.
pub fn write_captures<W: io::Write>(writer: W, captures: &CaptureSet) -> Result<(), OutputError> {
    let mut out = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    for record in captures.records() {
        out.serialize(CaptureRow::from(record))?;
    }
    out.flush()?;
    debug!(rows = captures.len(), "Wrote capture table");
    Ok(())
}

/// Write the targeted rows of a selection, flag column included.
pub fn write_targets<W: io::Write>(writer: W, result: &SelectionResult) -> Result<(), OutputError> {
    let mut out = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
    let mut rows = 0usize;
    for selected in result.rows().iter().filter(|s| s.is_target) {
        out.serialize(TargetRow::new(&selected.record, selected.is_target))?;
        rows += 1;
    }
    out.flush()?;
    debug!(rows, "Wrote selection targets");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{test_record, SelectedCapture};

    fn lines(buf: Vec<u8>) -> Vec<String> {
        String::from_utf8(buf)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_write_captures_full_table() {
        let captures = CaptureSet::from_records(vec![
            test_record("20200101090000"),
            test_record("20200101100000"),
        ]);

        let mut buf = Vec::new();
        write_captures(&mut buf, &captures).unwrap();
        let lines = lines(buf);

        assert_eq!(lines.len(), 3); // header + 2 rows
        assert_eq!(
            lines[0],
            "urlkey\ttimestamp\toriginal\tmimetype\tstatuscode\tdigest\tlength\tdatetime"
        );
        assert!(lines[1].starts_with("com,example)/\t20200101090000\t"));
        assert!(lines[1].contains("2020-01-01T09:00:00+00:00"));
        assert!(!lines[0].contains("is_target"));
    }

    #[test]
    fn test_write_targets_only_flagged_rows() {
        let result = SelectionResult::new(vec![
            SelectedCapture {
                record: test_record("20200101090000"),
                is_target: true,
            },
            SelectedCapture {
                record: test_record("20200101100000"),
                is_target: false,
            },
            SelectedCapture {
                record: test_record("20200101110000"),
                is_target: true,
            },
        ]);

        let mut buf = Vec::new();
        write_targets(&mut buf, &result).unwrap();
        let lines = lines(buf);

        assert_eq!(lines.len(), 3); // header + 2 target rows
        assert!(lines[0].ends_with("\tis_target"));
        assert!(lines[1].contains("20200101090000"));
        assert!(lines[1].ends_with("\ttrue"));
        assert!(lines[2].contains("20200101110000"));
        assert!(!lines.iter().any(|l| l.contains("20200101100000")));
    }

    #[test]
    fn test_empty_selection_writes_no_rows() {
        let result = SelectionResult::default();
        let mut buf = Vec::new();
        write_targets(&mut buf, &result).unwrap();
        // Nothing was serialized, so not even a header appears.
        assert!(buf.is_empty());
    }
}
