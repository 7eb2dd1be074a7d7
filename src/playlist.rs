//! M3U playlist emission.
//!
//! The playlist lists only files fetched in this run, relative to the output
//! directory with `/` separators, so the folder can be moved as a whole.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result, ResultExt};

/// Default playlist file name when the collection has no usable name.
pub const DEFAULT_FILE_NAME: &str = "downloaded_playlist.m3u";

const HEADER: &str = "#EXTM3U";

/// Playlist file name for a collection: its name reduced to alphanumerics,
/// spaces, `-` and `_`, plus `.m3u`; `default` when nothing usable remains.
pub fn playlist_file_name(collection_name: Option<&str>, default: &str) -> String {
    let cleaned: String = collection_name
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        default.to_string()
    } else {
        format!("{}.m3u", cleaned)
    }
}

/// Write `paths` as an M3U file in `output_dir`.
///
/// Returns `Ok(None)` without touching the disk when `paths` is empty.
pub fn write_m3u(paths: &[PathBuf], output_dir: &Path, file_name: &str) -> Result<Option<PathBuf>> {
    if paths.is_empty() {
        tracing::info!("No new tracks downloaded, skipping playlist");
        return Ok(None);
    }
    if file_name.trim().is_empty() || file_name.contains(['/', '\\']) {
        return Err(Error::playlist(format!("invalid playlist file name '{}'", file_name)));
    }

    let mut contents = String::from(HEADER);
    contents.push('\n');
    for path in paths {
        contents.push_str(&entry(path, output_dir));
        contents.push('\n');
    }

    let target = output_dir.join(file_name);
    let temp = output_dir.join(format!(".{}.tmp", file_name));
    {
        let mut file = std::fs::File::create(&temp)
            .with_context(format!("Failed to create {}", temp.display()))?;
        file.write_all(contents.as_bytes())
            .with_context(format!("Failed to write {}", temp.display()))?;
        file.sync_all()?;
    }
    if let Err(e) = std::fs::rename(&temp, &target) {
        let _ = std::fs::remove_file(&temp);
        return Err(Error::Io(e).context(format!("Failed to write {}", target.display())));
    }

    tracing::info!("Playlist written to {:?} ({} tracks)", target, paths.len());
    Ok(Some(target))
}

/// Playlist line for one file.
fn entry(path: &Path, output_dir: &Path) -> String {
    let relative = path.strip_prefix(output_dir).unwrap_or(path);
    let mut parts: Vec<String> = Vec::new();
    let mut absolute = false;

    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::RootDir => absolute = true,
            Component::Prefix(prefix) => {
                parts.push(prefix.as_os_str().to_string_lossy().into_owned())
            }
            Component::CurDir => {}
            Component::ParentDir => parts.push("..".to_string()),
        }
    }

    let joined = parts.join("/");
    if absolute && !joined.contains(':') {
        format!("/{}", joined)
    } else {
        joined
    }
}
