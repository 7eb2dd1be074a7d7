//! Catalogue for free-text searches when no Spotify credentials are set.
//!
//! The search text becomes a single query sent to the sources verbatim, and
//! the top source result is taken. Links and URIs still need Spotify.

use async_trait::async_trait;

use super::domain::{CatalogueError, Collection, CollectionKind, Reference};
use super::traits::CatalogueApi;
use crate::download::TrackQuery;

/// Resolves free text without contacting any catalogue service.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreeTextCatalogue;

#[async_trait]
impl CatalogueApi for FreeTextCatalogue {
    async fn resolve(&self, reference: &str) -> Result<Collection, CatalogueError> {
        match Reference::parse(reference)? {
            Reference::Search(text) => Ok(Collection {
                name: None,
                kind: CollectionKind::Search,
                tracks: vec![TrackQuery::free_text(text)],
            }),
            other => Err(CatalogueError::Credentials(format!(
                "resolving a Spotify {} needs SPOTIPY_CLIENT_ID and SPOTIPY_CLIENT_SECRET",
                other.kind()
            ))),
        }
    }
}
