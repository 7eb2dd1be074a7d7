//! Spotify Web API client
//!
//! Uses the client credentials flow: no user login, public data only.
//! See: https://developer.spotify.com/documentation/web-api
//!
//! ## Pagination
//! Playlist and album track lists are paged. We follow the absolute `next`
//! URL of each page until it is null, so ordering is exactly the catalogue's.

use serde::de::DeserializeOwned;

use super::{adapter, dto};
use crate::catalogue::domain::{CatalogueError, Collection, CollectionKind, Reference};
use crate::config::SpotifyCredentials;

const ACCOUNTS_URL: &str = "https://accounts.spotify.com/api/token";
const API_URL: &str = "https://api.spotify.com/v1";

/// Maximum page size of the playlist items endpoint
const PAGE_LIMIT: &str = "100";

/// Spotify catalogue client holding an app access token
pub struct SpotifyClient {
    http_client: reqwest::Client,
    access_token: String,
    api_url: String,
}

impl SpotifyClient {
    /// Obtain an access token. Missing or rejected credentials are fatal.
    pub async fn connect(credentials: &SpotifyCredentials) -> Result<Self, CatalogueError> {
        Self::connect_to(credentials, ACCOUNTS_URL, API_URL).await
    }

    async fn connect_to(
        credentials: &SpotifyCredentials,
        accounts_url: &str,
        api_url: &str,
    ) -> Result<Self, CatalogueError> {
        let client_id = non_empty(&credentials.client_id).ok_or_else(|| {
            CatalogueError::Credentials(
                "Spotify client id is not set (SPOTIPY_CLIENT_ID or [spotify].client_id)"
                    .to_string(),
            )
        })?;
        let client_secret = non_empty(&credentials.client_secret).ok_or_else(|| {
            CatalogueError::Credentials(
                "Spotify client secret is not set (SPOTIPY_CLIENT_SECRET or [spotify].client_secret)"
                    .to_string(),
            )
        })?;

        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .expect("Failed to build HTTP client");

        let response = http_client
            .post(accounts_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST || status == reqwest::StatusCode::UNAUTHORIZED {
            let error: dto::TokenError = response.json().await.unwrap_or_default();
            return Err(CatalogueError::Credentials(format!(
                "Spotify rejected the client credentials: {}",
                error.error_description.unwrap_or(error.error)
            )));
        }
        if !status.is_success() {
            return Err(CatalogueError::Network(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let token: dto::TokenResponse = response
            .json()
            .await
            .map_err(|e| CatalogueError::Parse(e.to_string()))?;
        tracing::debug!(
            "Spotify {} token obtained, expires in {}s",
            token.token_type,
            token.expires_in
        );

        Ok(Self {
            http_client,
            access_token: token.access_token,
            api_url: api_url.to_string(),
        })
    }

    /// Create a client for testing with a fixed token and custom base URL
    #[cfg(test)]
    pub fn with_base_url(access_token: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            access_token: access_token.into(),
            api_url: api_url.into(),
        }
    }

    /// Resolve a reference into an ordered list of track queries.
    pub async fn resolve(&self, reference: &str) -> Result<Collection, CatalogueError> {
        match Reference::parse(reference)? {
            Reference::Track(id) => self.track(&id).await,
            Reference::Playlist(id) => self.playlist(&id).await,
            Reference::Album(id) => self.album(&id).await,
            Reference::Search(text) => self.search(&text).await,
        }
    }

    async fn track(&self, id: &str) -> Result<Collection, CatalogueError> {
        let url = format!("{}/tracks/{}", self.api_url, id);
        let track: dto::Track = self.get_json(&url, &[]).await?;

        Ok(Collection {
            name: None,
            kind: CollectionKind::Track,
            tracks: adapter::to_queries(std::iter::once(&track)),
        })
    }

    async fn playlist(&self, id: &str) -> Result<Collection, CatalogueError> {
        let url = format!("{}/playlists/{}", self.api_url, id);
        let meta: dto::PlaylistName = self.get_json(&url, &[("fields", "name")]).await?;

        let url = format!("{}/playlists/{}/tracks", self.api_url, id);
        let first: dto::Paging<dto::PlaylistItem> =
            self.get_json(&url, &[("limit", PAGE_LIMIT)]).await?;
        let items = self.follow_pages(first).await?;
        tracing::debug!("Playlist '{}' has {} entries", meta.name, items.len());

        Ok(Collection {
            name: Some(meta.name).filter(|n| !n.trim().is_empty()),
            kind: CollectionKind::Playlist,
            tracks: adapter::playlist_queries(&items),
        })
    }

    async fn album(&self, id: &str) -> Result<Collection, CatalogueError> {
        let url = format!("{}/albums/{}", self.api_url, id);
        let album: dto::Album = self.get_json(&url, &[]).await?;
        let tracks = self.follow_pages(album.tracks).await?;

        Ok(Collection {
            name: Some(album.name).filter(|n| !n.trim().is_empty()),
            kind: CollectionKind::Album,
            tracks: adapter::to_queries(&tracks),
        })
    }

    /// Free-text search resolves to the single best hit, or nothing.
    async fn search(&self, text: &str) -> Result<Collection, CatalogueError> {
        let url = format!("{}/search", self.api_url);
        let response: dto::SearchResponse = self
            .get_json(&url, &[("q", text), ("type", "track"), ("limit", "1")])
            .await?;

        if response.tracks.items.is_empty() {
            tracing::warn!("No catalogue results for '{}'", text);
        }

        Ok(Collection {
            name: None,
            kind: CollectionKind::Search,
            tracks: adapter::to_queries(&response.tracks.items),
        })
    }

    /// Collect the items of `first` and every following page.
    async fn follow_pages<T: DeserializeOwned>(
        &self,
        first: dto::Paging<T>,
    ) -> Result<Vec<T>, CatalogueError> {
        let mut items = first.items;
        let mut next = first.next;

        while let Some(url) = next {
            let page: dto::Paging<T> = self.get_json(&url, &[]).await?;
            items.extend(page.items);
            next = page.next;
        }
        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogueError> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<dto::ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());

            return Err(match status {
                reqwest::StatusCode::UNAUTHORIZED => CatalogueError::Credentials(message),
                reqwest::StatusCode::BAD_REQUEST => CatalogueError::InvalidReference(message),
                reqwest::StatusCode::NOT_FOUND => CatalogueError::NotFound(url.to_string()),
                reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    CatalogueError::Network("rate limited by Spotify".to_string())
                }
                _ => CatalogueError::Api(format!("HTTP {}: {}", status, message)),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| CatalogueError::Parse(e.to_string()))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_with_base_url() {
        let client = SpotifyClient::with_base_url("token", "http://localhost:8080/v1");
        assert_eq!(client.api_url, "http://localhost:8080/v1");
        assert_eq!(client.access_token, "token");
    }

    #[tokio::test]
    async fn test_missing_credentials_are_fatal() {
        let credentials = SpotifyCredentials {
            client_id: Some("id".to_string()),
            client_secret: Some("   ".to_string()),
        };
        let result = SpotifyClient::connect(&credentials).await;
        assert!(matches!(result, Err(CatalogueError::Credentials(_))));

        let result = SpotifyClient::connect(&SpotifyCredentials::default()).await;
        assert!(matches!(result, Err(CatalogueError::Credentials(_))));
    }

    #[tokio::test]
    async fn test_unreachable_accounts_service() {
        let credentials = SpotifyCredentials {
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
        };
        let result =
            SpotifyClient::connect_to(&credentials, "http://127.0.0.1:9/api/token", API_URL).await;
        assert!(matches!(result, Err(CatalogueError::Network(_))));
    }

    #[tokio::test]
    async fn test_invalid_reference_needs_no_network() {
        let client = SpotifyClient::with_base_url("token", "http://127.0.0.1:9/v1");
        let result = client
            .resolve("https://open.spotify.com/show/5CfCWKI5pZ28U0uOzXkDHe")
            .await;
        assert!(matches!(result, Err(CatalogueError::InvalidReference(_))));
    }
}
