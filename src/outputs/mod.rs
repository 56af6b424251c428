//! Output generation modules for TSV tables and extraction JSON.
//!
//! # Submodules
//!
//! - [`tsv`]: Writes capture tables and selection results as
//!   tab-delimited text, to stdout or a file
//! - [`json`]: Writes one [`crate::models::FrontPageExtract`] JSON
//!   document per capture timestamp
//!
//! # Output Structure
//!
//! ```text
//! outfile.tsv                # capture table or targets-only selection
//!
//! download_dir/
//! └── nytimes/
//!     ├── raw/
//!     │   ├── 20200101090212.html
//!     │   └── 20200102090107.html
//!     └── parsed/
//!         ├── 20200101090212.json
//!         └── 20200102090107.json
//! ```

use thiserror::Error;

pub mod json;
pub mod tsv;

/// Errors raised while writing outputs.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to write delimited output: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to serialize extract: {0}")]
    Json(#[from] serde_json::Error),

    #[error("output I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
