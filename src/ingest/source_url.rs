// src/ingest/source_url.rs

use anyhow::{anyhow, Context, Result};
use url::Url;

const DIRECT_DOWNLOAD_BASE: &str = "https://drive.google.com/uc";

/// Turns a shared-drive "view" link into a direct download URL.
///
/// The file id is the second-to-last path segment, e.g.
/// `https://drive.google.com/file/d/<id>/view` -> `https://drive.google.com/uc?id=<id>`.
pub fn generate_url(csv_link: &str) -> Result<String> {
    let parsed = Url::parse(csv_link).with_context(|| format!("Invalid source link: {}", csv_link))?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.collect())
        .unwrap_or_default();
    if segments.len() < 2 {
        return Err(anyhow!("Source link has no file id segment: {}", csv_link));
    }
    let source_id = segments[segments.len() - 2];
    if source_id.is_empty() {
        return Err(anyhow!("Source link has an empty file id: {}", csv_link));
    }

    let mut download = Url::parse(DIRECT_DOWNLOAD_BASE).context("Invalid download base URL")?;
    download.query_pairs_mut().append_pair("id", source_id);
    Ok(download.to_string())
}
