//! Destination naming and atomic file writes.
//!
//! Every adapter renders the destination path *before* retrieving any audio
//! so an existing file can be detected and reported as already present.
//! Audio is streamed into a uniquely named `.part` file in the destination
//! folder and renamed only once complete; a [`PartialFile`] that is dropped
//! before [`PartialFile::finish`] removes its own temp file, so interrupted
//! downloads never look like successes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tokio::io::AsyncWriteExt;

use super::domain::{SearchCandidate, SourceError};

/// Extensions checked when looking for an already-downloaded track.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "m4a"];

/// Suffix for files that are still being written.
const PART_SUFFIX: &str = "part";

/// Metadata available for naming a track file.
#[derive(Debug, Clone, Default)]
pub struct TrackFileInfo {
    pub title: String,
    pub artist: String,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
}

impl From<&SearchCandidate> for TrackFileInfo {
    /// Naming fields known from a search result alone.
    fn from(candidate: &SearchCandidate) -> Self {
        Self {
            title: candidate.title.clone(),
            artist: candidate.artist.clone(),
            ..Default::default()
        }
    }
}

/// Path templates for downloaded files.
///
/// Variables: `{artist}`, `{albumartist}`, `{title}`, `{album}`, `{tracknumber}`.
/// `folder_format` may contain `/` to create nested folders; empty means flat.
#[derive(Debug, Clone)]
pub struct FileLayout {
    pub folder_format: String,
    pub track_format: String,
}

impl Default for FileLayout {
    fn default() -> Self {
        Self {
            folder_format: String::new(),
            track_format: "{artist} - {title}".to_string(),
        }
    }
}

impl FileLayout {
    /// Render the path of a track relative to the download folder, without extension.
    pub fn relative_stem(&self, info: &TrackFileInfo) -> PathBuf {
        let mut path = PathBuf::new();
        for segment in self.folder_format.split('/') {
            let rendered = render(segment, info);
            if !rendered.trim().is_empty() {
                path.push(rendered.trim());
            }
        }

        let file = render(&self.track_format, info);
        let file = file.trim();
        if file.is_empty() {
            path.push(sanitize_filename(&info.title));
        } else {
            path.push(file);
        }
        path
    }

    /// Whether rendering uses fields that only a metadata lookup provides.
    pub fn needs_metadata(&self) -> bool {
        [&self.folder_format, &self.track_format].iter().any(|template| {
            ["{album}", "{albumartist}", "{tracknumber}"]
                .iter()
                .any(|field| template.contains(field))
        })
    }

    /// Already-downloaded file for `candidate`, named from its search fields.
    ///
    /// Lets adapters skip every network call on a rerun. Returns `None` when
    /// the layout needs looked-up metadata; the caller then checks again once
    /// it has it.
    pub fn existing_for_candidate(
        &self,
        destination: &Path,
        candidate: &SearchCandidate,
    ) -> Option<PathBuf> {
        if self.needs_metadata() {
            return None;
        }
        find_existing(destination, &self.relative_stem(&TrackFileInfo::from(candidate)))
    }
}

fn render(template: &str, info: &TrackFileInfo) -> String {
    let track_num = info
        .track_number
        .map(|n| format!("{:02}", n))
        .unwrap_or_else(|| "00".to_string());
    let album_artist = info.album_artist.as_deref().unwrap_or(&info.artist);

    template
        .replace("{albumartist}", &sanitize_filename(album_artist))
        .replace("{artist}", &sanitize_filename(&info.artist))
        .replace("{title}", &sanitize_filename(&info.title))
        .replace("{album}", &sanitize_filename(info.album.as_deref().unwrap_or("Unknown Album")))
        .replace("{tracknumber}", &track_num)
}

/// Replace characters that are invalid in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            _ => c,
        })
        .collect()
}

/// Append an extension without touching dots already in the name.
pub fn with_extension(stem: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(stem.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Find a previously downloaded file for `stem` under `destination`, whatever its format.
pub fn find_existing(destination: &Path, stem: &Path) -> Option<PathBuf> {
    let base = destination.join(stem);
    AUDIO_EXTENSIONS
        .iter()
        .map(|ext| with_extension(&base, ext))
        .find(|candidate| candidate.is_file())
}

/// A file being written beside its destination under a unique `.part` name.
///
/// Concurrent writers for the same destination each get their own temp file,
/// so the last one to finish wins with a complete file.
pub struct PartialFile {
    file: Option<tokio::fs::File>,
    temp_path: Option<TempPath>,
    final_path: PathBuf,
    written: u64,
}

impl PartialFile {
    /// Create the temp file for `final_path`, creating parent folders as needed.
    pub async fn create(final_path: PathBuf) -> Result<Self, SourceError> {
        let parent = final_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        let name = final_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (file, temp_path) = tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(&format!(".{}", PART_SUFFIX))
            .tempfile_in(&parent)?
            .into_parts();

        Ok(Self {
            file: Some(tokio::fs::File::from_std(file)),
            temp_path: Some(temp_path),
            final_path,
            written: 0,
        })
    }

    pub async fn write_all(&mut self, bytes: &[u8]) -> Result<(), SourceError> {
        let file = self.file.as_mut().ok_or(SourceError::Io(
            "write after file was closed".to_string(),
        ))?;
        file.write_all(bytes).await?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    /// Flush and move the file into place. An empty download is an error.
    pub async fn finish(mut self) -> Result<PathBuf, SourceError> {
        if self.written == 0 {
            return Err(SourceError::Unavailable(format!(
                "no audio data received for {}",
                self.final_path.display()
            )));
        }

        if let Some(mut file) = self.file.take() {
            file.flush().await?;
            file.sync_all().await?;
        }
        let temp_path = self
            .temp_path
            .take()
            .ok_or(SourceError::Io("temp file already moved".to_string()))?;
        // On failure the returned path is dropped, which removes the temp file.
        temp_path
            .persist(&self.final_path)
            .map_err(|e| SourceError::from(e.error))?;

        Ok(self.final_path.clone())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        self.file.take();
        if let Some(temp_path) = self.temp_path.take() {
            let path = temp_path.to_path_buf();
            if let Err(e) = temp_path.close()
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!("Could not remove partial file {:?}: {}", path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn info() -> TrackFileInfo {
        TrackFileInfo {
            title: "Mr. Brightside".to_string(),
            artist: "The Killers".to_string(),
            album_artist: None,
            album: Some("Hot Fuss".to_string()),
            track_number: Some(2),
        }
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("AC/DC"), "AC_DC");
        assert_eq!(sanitize_filename("Track: Title"), "Track_ Title");
        assert_eq!(sanitize_filename("Valid Name"), "Valid Name");
        assert_eq!(sanitize_filename("a<b>c"), "a_b_c");
    }

    #[test]
    fn test_default_layout_is_flat() {
        let stem = FileLayout::default().relative_stem(&info());
        assert_eq!(stem, PathBuf::from("The Killers - Mr. Brightside"));
    }

    #[test]
    fn test_nested_layout() {
        let layout = FileLayout {
            folder_format: "{albumartist}/{album}".to_string(),
            track_format: "{tracknumber} - {title}".to_string(),
        };
        let stem = layout.relative_stem(&info());
        assert_eq!(
            stem,
            PathBuf::from("The Killers").join("Hot Fuss").join("02 - Mr. Brightside")
        );
    }

    #[test]
    fn test_needs_metadata() {
        assert!(!FileLayout::default().needs_metadata());

        let by_album = FileLayout {
            folder_format: "{albumartist}/{album}".to_string(),
            ..Default::default()
        };
        assert!(by_album.needs_metadata());

        let numbered = FileLayout {
            folder_format: String::new(),
            track_format: "{tracknumber} {title}".to_string(),
        };
        assert!(numbered.needs_metadata());
    }

    #[test]
    fn test_existing_for_candidate() {
        let dir = tempdir().unwrap();
        let found = crate::test_utils::candidate("deezer", "Mr. Brightside", "The Killers");
        std::fs::write(dir.path().join("The Killers - Mr. Brightside.m4a"), b"x").unwrap();

        assert_eq!(
            FileLayout::default().existing_for_candidate(dir.path(), &found),
            Some(dir.path().join("The Killers - Mr. Brightside.m4a"))
        );

        let nested = FileLayout {
            folder_format: "{album}".to_string(),
            ..Default::default()
        };
        assert!(nested.existing_for_candidate(dir.path(), &found).is_none());
    }

    #[test]
    fn test_with_extension_keeps_dots_in_title() {
        let path = with_extension(Path::new("The Killers - Mr. Brightside"), "mp3");
        assert_eq!(path, PathBuf::from("The Killers - Mr. Brightside.mp3"));
    }

    #[test]
    fn test_find_existing_checks_all_formats() {
        let dir = tempdir().unwrap();
        let stem = PathBuf::from("Artist - Song");
        assert!(find_existing(dir.path(), &stem).is_none());

        std::fs::write(dir.path().join("Artist - Song.flac"), b"x").unwrap();
        assert_eq!(
            find_existing(dir.path(), &stem),
            Some(dir.path().join("Artist - Song.flac"))
        );
    }

    fn part_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.to_string_lossy().ends_with(".part"))
            .collect()
    }

    #[tokio::test]
    async fn test_partial_file_renames_on_finish() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("sub");
        let target = sub.join("song.mp3");

        let mut part = PartialFile::create(target.clone()).await.unwrap();
        part.write_all(b"audio").await.unwrap();
        assert_eq!(part_files(&sub).len(), 1);
        assert!(!target.exists());

        let path = part.finish().await.unwrap();
        assert_eq!(path, target);
        assert_eq!(std::fs::read(&target).unwrap(), b"audio");
        assert!(part_files(&sub).is_empty());
    }

    #[tokio::test]
    async fn test_dropped_partial_file_is_removed() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("song.mp3");

        {
            let mut part = PartialFile::create(target.clone()).await.unwrap();
            part.write_all(b"half").await.unwrap();
        }

        assert!(!target.exists());
        assert!(part_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_download_is_not_a_success() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("song.mp3");

        let part = PartialFile::create(target.clone()).await.unwrap();
        assert!(part.finish().await.is_err());
        assert!(!target.exists());
        assert!(part_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_never_mix_contents() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("song.mp3");

        let mut a = PartialFile::create(target.clone()).await.unwrap();
        let mut b = PartialFile::create(target.clone()).await.unwrap();
        assert_eq!(part_files(dir.path()).len(), 2);

        for _ in 0..5 {
            a.write_all(b"AA").await.unwrap();
            b.write_all(b"B").await.unwrap();
        }

        assert_eq!(a.finish().await.unwrap(), target);
        assert_eq!(std::fs::read(&target).unwrap(), b"AAAAAAAAAA");
        assert_eq!(b.finish().await.unwrap(), target);
        assert_eq!(std::fs::read(&target).unwrap(), b"BBBBB");
        assert!(part_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_dropping_one_writer_leaves_the_other_intact() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("song.mp3");

        let mut kept = PartialFile::create(target.clone()).await.unwrap();
        {
            let mut abandoned = PartialFile::create(target.clone()).await.unwrap();
            abandoned.write_all(b"partial").await.unwrap();
            kept.write_all(b"complete").await.unwrap();
        }

        assert_eq!(part_files(dir.path()).len(), 1);
        kept.finish().await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"complete");
        assert!(part_files(dir.path()).is_empty());
    }
}
