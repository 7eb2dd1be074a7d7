//! Capability interface for content sources.
//!
//! The resolver depends only on [`SourceAdapter`]. Production code uses the
//! real clients ([`DeezerClient`], [`QobuzClient`]), while tests substitute
//! the mock implementations in [`mocks`].
//!
//! [`DeezerClient`]: super::deezer::DeezerClient
//! [`QobuzClient`]: super::qobuz::QobuzClient

use std::path::Path;

use async_trait::async_trait;

use super::domain::{FetchOutcome, SearchCandidate, SourceError, SourceId};

/// A content source that can search for and retrieve tracks.
///
/// One value is one session: it is logged in once and reused for every track
/// of a batch. Dropping it releases its connections.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier of this source.
    fn id(&self) -> SourceId;

    /// Establish the session. Failure disables the source for the run.
    async fn login(&mut self) -> Result<(), SourceError>;

    /// Search with a free-text query, returning results in the source's ranking.
    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, SourceError>;

    /// Resolve metadata for `candidate` and retrieve its audio into `destination`.
    ///
    /// Must not download when a file for the track already exists, and must
    /// never leave a partial file at the final path.
    async fn resolve_and_fetch(
        &self,
        candidate: &SearchCandidate,
        destination: &Path,
    ) -> Result<FetchOutcome, SourceError>;
}

// Implement the trait for the real clients

#[async_trait]
impl SourceAdapter for super::deezer::DeezerClient {
    fn id(&self) -> SourceId {
        SourceId::from(super::deezer::SOURCE_ID)
    }

    async fn login(&mut self) -> Result<(), SourceError> {
        super::deezer::DeezerClient::login(self).await
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, SourceError> {
        self.search_tracks(query).await
    }

    async fn resolve_and_fetch(
        &self,
        candidate: &SearchCandidate,
        destination: &Path,
    ) -> Result<FetchOutcome, SourceError> {
        self.fetch_track(candidate, destination).await
    }
}

#[async_trait]
impl SourceAdapter for super::qobuz::QobuzClient {
    fn id(&self) -> SourceId {
        SourceId::from(super::qobuz::SOURCE_ID)
    }

    async fn login(&mut self) -> Result<(), SourceError> {
        super::qobuz::QobuzClient::login(self).await
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchCandidate>, SourceError> {
        self.search_tracks(query).await
    }

    async fn resolve_and_fetch(
        &self,
        candidate: &SearchCandidate,
        destination: &Path,
    ) -> Result<FetchOutcome, SourceError> {
        self.fetch_track(candidate, destination).await
    }
}
