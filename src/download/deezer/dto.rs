//! Deezer API Data Transfer Objects
//!
//! These types match what the Deezer endpoints return (or accept).
//! DO NOT use these types outside the deezer module - convert to domain types.
//!
//! Three services are involved:
//! - the public API (`api.deezer.com`): search and album metadata
//! - the gateway (`www.deezer.com/ajax/gw-light.php`): session and track tokens
//! - the media service (`media.deezer.com/v1/get_url`): stream URLs
//!
//! Example search response:
//! ```json
//! {
//!   "data": [{
//!     "id": 3135556,
//!     "title": "Harder, Better, Faster, Stronger",
//!     "artist": {"id": 27, "name": "Daft Punk"},
//!     "album": {"id": 302127, "title": "Discovery", "cover_xl": "https://..."}
//!   }],
//!   "total": 1
//! }
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Public API
// ============================================================================

/// Error object returned by the public API with HTTP 200
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: String,
    pub code: Option<i64>,
}

/// `GET /search/track`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchResponse {
    pub data: Vec<SearchTrack>,
    pub total: Option<u32>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchTrack {
    pub id: Option<u64>,
    pub title: String,
    pub artist: Option<ArtistRef>,
    pub album: Option<AlbumRef>,
    pub readable: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtistRef {
    pub id: Option<u64>,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AlbumRef {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub cover_xl: Option<String>,
}

/// `GET /album/{id}`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Album {
    pub id: Option<u64>,
    pub title: Option<String>,
    pub artist: Option<ArtistRef>,
    pub cover_xl: Option<String>,
    pub cover_big: Option<String>,
    pub tracks: Option<AlbumTracks>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AlbumTracks {
    pub data: Vec<AlbumTrack>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AlbumTrack {
    pub id: Option<u64>,
    pub title: String,
}

// ============================================================================
// Gateway
// ============================================================================

/// Envelope of every gateway call.
///
/// `error` is `[]` on success and an object keyed by error type otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayResponse<T> {
    #[serde(default)]
    pub error: serde_json::Value,
    pub results: Option<T>,
}

/// `deezer.getUserData`
#[derive(Debug, Clone, Deserialize)]
pub struct UserData {
    #[serde(rename = "USER")]
    pub user: User,
    #[serde(rename = "checkForm")]
    pub check_form: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// Number for logged-in users, `0` when the arl was rejected
    #[serde(rename = "USER_ID")]
    pub user_id: serde_json::Value,
    #[serde(rename = "OPTIONS", default)]
    pub options: UserOptions,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserOptions {
    pub license_token: Option<String>,
}

/// `song.getData`
#[derive(Debug, Clone, Deserialize)]
pub struct SongData {
    #[serde(rename = "SNG_ID")]
    pub id: serde_json::Value,
    #[serde(rename = "SNG_TITLE", default)]
    pub title: String,
    #[serde(rename = "ART_NAME", default)]
    pub artist: String,
    #[serde(rename = "ALB_TITLE")]
    pub album: Option<String>,
    #[serde(rename = "TRACK_NUMBER")]
    pub track_number: Option<serde_json::Value>,
    #[serde(rename = "TRACK_TOKEN")]
    pub track_token: Option<String>,
}

// ============================================================================
// Media service
// ============================================================================

/// Body of `POST media.deezer.com/v1/get_url`
#[derive(Debug, Clone, Serialize)]
pub struct MediaRequest {
    pub license_token: String,
    pub media: Vec<MediaSpec>,
    pub track_tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub formats: Vec<CipherFormat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CipherFormat {
    pub cipher: String,
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaResponse {
    pub data: Vec<MediaData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MediaData {
    pub media: Vec<Medium>,
    pub errors: Vec<MediaError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Medium {
    pub format: String,
    pub cipher: Option<MediaCipher>,
    #[serde(default)]
    pub sources: Vec<MediaSource>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaCipher {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSource {
    pub url: String,
    pub provider: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
