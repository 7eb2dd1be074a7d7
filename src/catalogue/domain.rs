//! Catalogue domain types.
//!
//! A catalogue reference resolves to a [`Collection`]: an ordered list of
//! [`TrackQuery`] values plus an optional display name used for the playlist.

use std::fmt;

use thiserror::Error;

use crate::download::TrackQuery;

/// What a reference pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Track,
    Playlist,
    Album,
    /// Free-text search, resolved to its best hit
    Search,
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Track => "track",
            Self::Playlist => "playlist",
            Self::Album => "album",
            Self::Search => "search",
        };
        f.write_str(name)
    }
}

/// Flattened, order-preserving result of resolving a reference.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Playlist or album name; `None` for single tracks and searches
    pub name: Option<String>,
    pub kind: CollectionKind,
    pub tracks: Vec<TrackQuery>,
}

impl Collection {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// A parsed catalogue reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Track(String),
    Playlist(String),
    Album(String),
    Search(String),
}

impl Reference {
    /// Parse a share URL (`https://open.spotify.com/{kind}/{id}`), a URI
    /// (`spotify:{kind}:{id}`) or anything else as free text.
    pub fn parse(input: &str) -> Result<Self, CatalogueError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CatalogueError::InvalidReference(
                "reference is empty".to_string(),
            ));
        }

        if let Some(rest) = input.strip_prefix("spotify:") {
            // Legacy URIs carry a user segment: spotify:user:<name>:playlist:<id>
            let parts: Vec<&str> = rest.split(':').collect();
            if parts.len() < 2 {
                return Err(CatalogueError::InvalidReference(input.to_string()));
            }
            let (kind, id) = (parts[parts.len() - 2], parts[parts.len() - 1]);
            return Self::from_parts(kind, id, input);
        }

        if let Some(position) = input.find("open.spotify.com/") {
            let path = &input[position + "open.spotify.com/".len()..];
            let path = path.split(['?', '#']).next().unwrap_or_default();
            let segments: Vec<&str> = path
                .split('/')
                .filter(|s| !s.is_empty() && !s.starts_with("intl-"))
                .collect();
            return match segments.as_slice() {
                [kind, id, ..] => Self::from_parts(kind, id, input),
                _ => Err(CatalogueError::InvalidReference(input.to_string())),
            };
        }

        Ok(Self::Search(input.to_string()))
    }

    fn from_parts(kind: &str, id: &str, input: &str) -> Result<Self, CatalogueError> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(CatalogueError::InvalidReference(format!(
                "bad id in {}",
                input
            )));
        }
        match kind {
            "track" => Ok(Self::Track(id.to_string())),
            "playlist" => Ok(Self::Playlist(id.to_string())),
            "album" => Ok(Self::Album(id.to_string())),
            other => Err(CatalogueError::InvalidReference(format!(
                "unsupported reference type '{}'",
                other
            ))),
        }
    }

    pub fn kind(&self) -> CollectionKind {
        match self {
            Self::Track(_) => CollectionKind::Track,
            Self::Playlist(_) => CollectionKind::Playlist,
            Self::Album(_) => CollectionKind::Album,
            Self::Search(_) => CollectionKind::Search,
        }
    }
}

/// Errors from the catalogue collaborator
#[derive(Debug, Clone, Error)]
pub enum CatalogueError {
    /// Missing or rejected client credentials. Fatal for the run.
    #[error("Catalogue credentials error: {0}")]
    Credentials(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for CatalogueError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}
