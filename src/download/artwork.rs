//! Album cover side-fetch.
//!
//! Covers are saved once per album under `<destination>/.artwork/`. A failure
//! here is logged by the caller and never fails the track.

use std::path::{Path, PathBuf};

use super::domain::SourceError;
use super::files::{PartialFile, sanitize_filename};

/// Folder under the download destination holding covers.
pub const ARTWORK_DIR: &str = ".artwork";

/// Where the cover for `album_key` is stored.
pub fn cover_path(destination: &Path, album_key: &str) -> PathBuf {
    destination
        .join(ARTWORK_DIR)
        .join(format!("{}.jpg", sanitize_filename(album_key)))
}

/// Download a cover unless it is already on disk.
pub async fn save_cover(
    http_client: &reqwest::Client,
    url: &str,
    destination: &Path,
    album_key: &str,
) -> Result<PathBuf, SourceError> {
    let path = cover_path(destination, album_key);
    if path.is_file() {
        return Ok(path);
    }

    let response = http_client.get(url).send().await?;
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(SourceError::NotFound(format!("cover {}", url)));
    }
    if !status.is_success() {
        return Err(SourceError::Network(format!(
            "HTTP {}: {}",
            status,
            status.canonical_reason().unwrap_or("Unknown")
        )));
    }

    let data = response.bytes().await?;
    let mut file = PartialFile::create(path).await?;
    file.write_all(&data).await?;
    let path = file.finish().await?;

    tracing::debug!("Saved cover art to {:?}", path);
    Ok(path)
}
