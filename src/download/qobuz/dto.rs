//! Qobuz API Data Transfer Objects
//!
//! These types match what `www.qobuz.com/api.json/0.2` returns.
//! DO NOT use these types outside the qobuz module - convert to domain types.
//!
//! Example search response:
//! ```json
//! {
//!   "tracks": {
//!     "total": 1,
//!     "items": [{
//!       "id": 12345,
//!       "title": "Hey Jude",
//!       "version": "Remastered 2015",
//!       "track_number": 21,
//!       "performer": {"id": 26390, "name": "The Beatles"},
//!       "album": {"id": "0060254728", "title": "1", "image": {"large": "https://..."}}
//!     }]
//!   }
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Error body returned with non-2xx statuses
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorResponse {
    pub status: Option<String>,
    pub code: Option<i64>,
    pub message: String,
}

/// `GET user/login`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoginResponse {
    pub user_auth_token: Option<String>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct User {
    pub id: Option<u64>,
    pub credential: Option<Credential>,
}

/// Subscription details; `parameters` is null for free accounts.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Credential {
    pub id: Option<u64>,
    pub label: Option<String>,
    pub parameters: Option<serde_json::Value>,
}

/// `GET track/search`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchResponse {
    pub query: Option<String>,
    pub tracks: Option<TrackPage>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackPage {
    pub total: Option<u32>,
    pub items: Vec<Track>,
}

/// Track as returned by `track/search` and `track/get`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Track {
    pub id: Option<u64>,
    pub title: String,
    pub version: Option<String>,
    pub track_number: Option<u32>,
    pub performer: Option<Performer>,
    pub album: Option<Album>,
    pub streamable: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Performer {
    pub id: Option<u64>,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Album {
    /// Qobuz album ids are strings
    pub id: Option<String>,
    pub title: Option<String>,
    pub artist: Option<Performer>,
    pub image: Option<Image>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Image {
    pub large: Option<String>,
    pub small: Option<String>,
    pub thumbnail: Option<String>,
}

/// `GET track/getFileUrl`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FileUrlResponse {
    pub track_id: Option<u64>,
    pub url: Option<String>,
    pub format_id: Option<u32>,
    pub mime_type: Option<String>,
    /// Set when only a 30s preview is available
    pub sample: Option<bool>,
    pub restrictions: Vec<Restriction>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Restriction {
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "query": "The Beatles - Hey Jude",
            "tracks": {
                "limit": 10,
                "offset": 0,
                "total": 1,
                "items": [{
                    "id": 12345,
                    "title": "Hey Jude",
                    "version": "Remastered 2015",
                    "track_number": 21,
                    "performer": {"id": 26390, "name": "The Beatles"},
                    "album": {
                        "id": "0060254728",
                        "title": "1",
                        "image": {"large": "https://static.qobuz.com/cover_600.jpg"}
                    }
                }]
            }
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let track = &response.tracks.unwrap().items[0];
        assert_eq!(track.id, Some(12345));
        assert_eq!(track.performer.as_ref().unwrap().name, "The Beatles");
        assert_eq!(track.album.as_ref().unwrap().id.as_deref(), Some("0060254728"));
    }

    #[test]
    fn test_parse_free_account_login() {
        let json = r#"{
            "user_auth_token": "token",
            "user": {"id": 1, "credential": {"id": null, "label": null, "parameters": null}}
        }"#;
        let response: LoginResponse = serde_json::from_str(json).unwrap();
        let credential = response.user.unwrap().credential.unwrap();
        assert!(credential.parameters.is_none());
    }

    #[test]
    fn test_parse_sample_file_url() {
        let json = r#"{
            "track_id": 12345,
            "url": "https://streaming-qobuz-sec.akamaized.net/file",
            "format_id": 5,
            "mime_type": "audio/mpeg",
            "sample": true,
            "restrictions": [{"code": "TrackRestrictedByRightHolders"}]
        }"#;
        let response: FileUrlResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.sample, Some(true));
        assert_eq!(response.restrictions[0].code, "TrackRestrictedByRightHolders");
    }

    #[test]
    fn test_parse_error_response() {
        let json = r#"{"status": "error", "code": 401, "message": "User authentication is required."}"#;
        let response: ErrorResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, Some(401));
    }
}
