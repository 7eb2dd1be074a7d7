//! Trait definition for the catalogue collaborator.
//!
//! Production code uses [`SpotifyClient`], or [`FreeTextCatalogue`] for plain
//! searches without credentials; tests substitute [`mocks::MockCatalogue`].
//!
//! [`SpotifyClient`]: super::spotify::SpotifyClient
//! [`FreeTextCatalogue`]: super::free_text::FreeTextCatalogue

use async_trait::async_trait;

use super::domain::{CatalogueError, Collection};

/// Resolves a reference into an ordered, flattened list of tracks.
///
/// Collections are paginated by the implementation; callers always get the
/// full list in catalogue order.
#[async_trait]
pub trait CatalogueApi: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<Collection, CatalogueError>;
}

#[async_trait]
impl CatalogueApi for super::spotify::SpotifyClient {
    async fn resolve(&self, reference: &str) -> Result<Collection, CatalogueError> {
        super::spotify::SpotifyClient::resolve(self, reference).await
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::MockCatalogue;
    use super::*;
    use crate::catalogue::domain::CollectionKind;
    use crate::test_utils::query;

    #[tokio::test]
    async fn test_mock_catalogue_via_trait() {
        let catalogue: Box<dyn CatalogueApi> = Box::new(MockCatalogue::with_tracks(
            Some("Road Trip"),
            vec![query("Hey Jude", &["The Beatles"])],
        ));

        let collection = catalogue
            .resolve("https://open.spotify.com/playlist/37i9dQZF1DXcBWIGoYBM5M")
            .await
            .unwrap();
        assert_eq!(collection.kind, CollectionKind::Playlist);
        assert_eq!(collection.name.as_deref(), Some("Road Trip"));
        assert_eq!(collection.tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_mock_catalogue_error() {
        let catalogue = MockCatalogue::failing(CatalogueError::Credentials("nope".to_string()));
        assert!(matches!(
            catalogue.resolve("anything").await,
            Err(CatalogueError::Credentials(_))
        ));
    }
}
