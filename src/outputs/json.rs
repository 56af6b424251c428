//! JSON output for front-page extracts.
//!
//! Each targeted capture that goes through a publisher scraper produces
//! one [`FrontPageExtract`], written as
//! `{out_dir}/{publisher}/parsed/{TS}.json` so parsed documents sit next
//! to the raw snapshots they came from.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, instrument};

use crate::models::FrontPageExtract;
use crate::outputs::OutputError;

/// Write one extract to its place in the output tree.
///
/// Creates the `parsed/` directory as needed and overwrites an existing
/// document for the same capture (re-running extraction refreshes it).
#[instrument(level = "info", skip_all, fields(publisher = %extract.publisher, timestamp = %extract.capture_timestamp))]
pub async fn write_extract(
    extract: &FrontPageExtract,
    out_dir: &Path,
) -> Result<PathBuf, OutputError> {
    let parsed_dir = out_dir.join(&extract.publisher).join("parsed");
    fs::create_dir_all(&parsed_dir).await?;

    let path = parsed_dir.join(format!("{}.json", extract.capture_timestamp));
    let json = serde_json::to_string(extract)?;
    fs::write(&path, json).await?;

    info!(path = %path.display(), articles = extract.articles.len(), "Wrote front-page extract");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedArticle;
    use crate::timestamp::parse_wayback14;

    #[tokio::test]
    async fn test_write_extract_layout_and_content() {
        let out_dir = std::env::temp_dir().join(format!("frontpage_scan_test_{}", std::process::id()));

        let extract = FrontPageExtract {
            publisher: "cnn".to_string(),
            capture_timestamp: "20200101180000".to_string(),
            captured_at: parse_wayback14("20200101180000").unwrap(),
            articles: vec![ExtractedArticle {
                rank: 1,
                url: "https://www.cnn.com/story".to_string(),
                headline: "Headline".to_string(),
                scrape: None,
            }],
        };

        let path = write_extract(&extract, &out_dir).await.unwrap();
        assert_eq!(path, out_dir.join("cnn").join("parsed").join("20200101180000.json"));

        let body = fs::read_to_string(&path).await.unwrap();
        let back: FrontPageExtract = serde_json::from_str(&body).unwrap();
        assert_eq!(back.publisher, "cnn");
        assert_eq!(back.articles.len(), 1);

        let _ = fs::remove_dir_all(&out_dir).await;
    }
}
