//! Internal domain models for track resolution.
//!
//! These types are OUR types - they don't change when a source's API changes.
//! Every source response gets converted into these via that source's adapter.

use std::fmt;
use std::path::PathBuf;

/// A track to resolve, as reported by the catalogue.
///
/// Built once from catalogue data and never mutated afterwards; there are no
/// setters, only accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackQuery {
    title: String,
    artists: Vec<String>,
    free_text: bool,
}

impl TrackQuery {
    /// Create a query. Artist order is the catalogue's (primary artist first).
    pub fn new(title: impl Into<String>, artists: Vec<String>) -> Self {
        Self {
            title: title.into(),
            artists,
            free_text: false,
        }
    }

    /// A user's search text sent to the sources as is, with no catalogue
    /// metadata to match results against.
    pub fn free_text(text: impl Into<String>) -> Self {
        Self {
            title: text.into(),
            artists: Vec::new(),
            free_text: true,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artists(&self) -> &[String] {
        &self.artists
    }

    pub fn is_free_text(&self) -> bool {
        self.free_text
    }

    /// Free-text query sent to every source: `"<artists> - <title>"`, or
    /// just the title when no artist is known.
    pub fn search_query(&self) -> String {
        if self.artists.is_empty() {
            return self.title.clone();
        }
        format!("{} - {}", self.artists.join(", "), self.title)
    }
}

impl fmt::Display for TrackQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.search_query())
    }
}

/// Identifier of a content source (`"deezer"`, `"qobuz"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One normalized search result from a source.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    /// Source that produced this result
    pub source_id: SourceId,
    /// Source-specific track identifier (empty when the source omitted it)
    pub external_id: String,
    /// Track title as reported by the source
    pub title: String,
    /// Single (primary) artist reported by the source
    pub artist: String,
    /// Source-specific album identifier, needed to fetch
    pub album_id: Option<String>,
    /// Relevance score reported by the source, when it exposes one (0.0 to 1.0)
    pub score: Option<f32>,
}

impl SearchCandidate {
    /// Whether the candidate carries enough identity to be fetched.
    pub fn is_resolvable(&self) -> bool {
        !self.external_id.trim().is_empty()
            && self
                .album_id
                .as_deref()
                .is_some_and(|id| !id.trim().is_empty())
    }
}

impl fmt::Display for SearchCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {} ({}:{})", self.title, self.artist, self.source_id, self.external_id)
    }
}

/// Outcome of matching a query against a source's search results.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    /// The top candidate matched; `confidence` is always in `[0, 1]`.
    Matched {
        candidate: SearchCandidate,
        confidence: f32,
    },
    NoMatch,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        matches!(self, Self::Matched { .. })
    }
}

/// What a source adapter did with an accepted candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The file was retrieved and atomically moved into place
    Fetched(PathBuf),
    /// A file for this track was already present; nothing was downloaded
    AlreadyExists(PathBuf),
}

/// Terminal result for one track in one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Success { path: PathBuf, source_id: SourceId },
    AlreadyExists { path: PathBuf, source_id: SourceId },
    Failed { attempted_sources: Vec<SourceId> },
}

impl ResolutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Aggregated result of a batch run.
///
/// Append-only while the batch runs; `successes` keeps input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    /// Paths of newly fetched files, in catalogue order
    pub successes: Vec<PathBuf>,
    /// Tracks skipped because a file was already present
    pub already_present: usize,
    /// Tracks that no source could satisfy (including crashed items)
    pub failed_count: usize,
    /// Tracks processed
    pub total_count: usize,
}

impl BatchResult {
    /// Record a terminal outcome.
    pub fn record(&mut self, outcome: &ResolutionOutcome) {
        self.total_count += 1;
        match outcome {
            ResolutionOutcome::Success { path, .. } => self.successes.push(path.clone()),
            ResolutionOutcome::AlreadyExists { .. } => self.already_present += 1,
            ResolutionOutcome::Failed { .. } => self.failed_count += 1,
        }
    }

    /// Record an item whose resolution crashed.
    pub fn record_crash(&mut self) {
        self.total_count += 1;
        self.failed_count += 1;
    }
}

/// Errors raised inside a source adapter.
///
/// These stay below the resolver: every variant becomes "try the next source".
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("Login failed: {0}")]
    Login(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Rate limited - try again later")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Track unavailable: {0}")]
    Unavailable(String),

    #[error("File error: {0}")]
    Io(String),

    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("Source used before login")]
    NotLoggedIn,
}

impl From<std::io::Error> for SourceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_joins_artists() {
        let query = TrackQuery::new(
            "Under Pressure",
            vec!["Queen".to_string(), "David Bowie".to_string()],
        );
        assert_eq!(query.search_query(), "Queen, David Bowie - Under Pressure");
    }

    #[test]
    fn test_free_text_query_is_sent_verbatim() {
        let query = TrackQuery::free_text("bohemian rhapsody queen");
        assert!(query.is_free_text());
        assert_eq!(query.search_query(), "bohemian rhapsody queen");
        assert!(!TrackQuery::new("Song", vec!["Artist".to_string()]).is_free_text());
    }

    #[test]
    fn test_candidate_without_album_is_not_resolvable() {
        let candidate = SearchCandidate {
            source_id: SourceId::from("deezer"),
            external_id: "123".to_string(),
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            album_id: None,
            score: None,
        };
        assert!(!candidate.is_resolvable());

        let with_album = SearchCandidate {
            album_id: Some("456".to_string()),
            ..candidate
        };
        assert!(with_album.is_resolvable());
    }

    #[test]
    fn test_batch_result_excludes_already_present_from_successes() {
        let mut result = BatchResult::default();
        result.record(&ResolutionOutcome::Success {
            path: PathBuf::from("/music/a.mp3"),
            source_id: SourceId::from("deezer"),
        });
        result.record(&ResolutionOutcome::AlreadyExists {
            path: PathBuf::from("/music/b.mp3"),
            source_id: SourceId::from("deezer"),
        });
        result.record(&ResolutionOutcome::Failed {
            attempted_sources: vec![],
        });
        result.record_crash();

        assert_eq!(result.successes, vec![PathBuf::from("/music/a.mp3")]);
        assert_eq!(result.already_present, 1);
        assert_eq!(result.failed_count, 2);
        assert_eq!(result.total_count, 4);
    }
}
