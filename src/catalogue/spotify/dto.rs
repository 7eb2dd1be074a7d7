//! Spotify Web API Data Transfer Objects
//!
//! These types match the Spotify Web API JSON (only the fields we use).
//! DO NOT use these types outside the spotify module - convert to domain types.

use serde::{Deserialize, Serialize};

/// `POST accounts.spotify.com/api/token` (client credentials flow)
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// Error body of the accounts service
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TokenError {
    pub error: String,
    pub error_description: Option<String>,
}

/// Error body of the Web API
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErrorDetail {
    pub status: u16,
    pub message: String,
}

/// Paging object used by every list endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
    pub total: Option<u32>,
}

/// Simplified or full track object
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Track {
    pub id: Option<String>,
    pub name: String,
    pub artists: Vec<ArtistRef>,
    /// `"track"` or `"episode"` inside playlists
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtistRef {
    pub id: Option<String>,
    pub name: String,
}

/// `GET /playlists/{id}?fields=name`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaylistName {
    pub name: String,
}

/// Item of `GET /playlists/{id}/tracks`; `track` is null for removed tracks
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaylistItem {
    pub track: Option<Track>,
}

/// `GET /albums/{id}`, including the first page of tracks
#[derive(Debug, Clone, Deserialize)]
pub struct Album {
    #[serde(default)]
    pub name: String,
    pub tracks: Paging<Track>,
}

/// `GET /search?type=track`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub tracks: Paging<Track>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_playlist_page() {
        let json = r#"{
            "href": "https://api.spotify.com/v1/playlists/abc/tracks?offset=0&limit=100",
            "items": [
                {"added_at": "2020-01-01T00:00:00Z", "track": {
                    "id": "4uLU6hMCjMI75M1A2tKUQC",
                    "name": "Never Gonna Give You Up",
                    "type": "track",
                    "artists": [{"id": "0gxyHStUsqpMadRV0Di1Qt", "name": "Rick Astley"}]
                }},
                {"added_at": "2020-01-01T00:00:00Z", "track": null}
            ],
            "limit": 100,
            "next": "https://api.spotify.com/v1/playlists/abc/tracks?offset=100&limit=100",
            "offset": 0,
            "total": 150
        }"#;

        let page: Paging<PlaylistItem> = serde_json::from_str(json).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.items[1].track.is_none());
        assert!(page.next.is_some());
        assert_eq!(page.total, Some(150));
    }

    #[test]
    fn test_parse_album() {
        let json = r#"{
            "name": "Abbey Road",
            "tracks": {
                "items": [{"name": "Come Together", "artists": [{"name": "The Beatles"}]}],
                "next": null,
                "total": 1
            }
        }"#;
        let album: Album = serde_json::from_str(json).unwrap();
        assert_eq!(album.name, "Abbey Road");
        assert_eq!(album.tracks.items[0].artists[0].name, "The Beatles");
        assert!(album.tracks.next.is_none());
    }

    #[test]
    fn test_parse_error() {
        let json = r#"{"error": {"status": 401, "message": "The access token expired"}}"#;
        let error: ErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(error.error.status, 401);
    }
}
