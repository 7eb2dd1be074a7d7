//! Adapter layer: Convert Deezer DTOs to domain models
//!
//! This is the ONLY place where Deezer DTO types are converted to domain types.

use super::dto;
use super::SOURCE_ID;
use crate::download::domain::{SearchCandidate, SourceError, SourceId};
use crate::download::files::TrackFileInfo;

/// Session state obtained at login.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: u64,
    /// `checkForm` token required by gateway calls
    pub api_token: String,
    /// Token required by the media service
    pub license_token: String,
}

/// Convert a search response to candidates, keeping Deezer's ranking.
pub fn to_candidates(response: dto::SearchResponse) -> Result<Vec<SearchCandidate>, SourceError> {
    if let Some(error) = response.error {
        return Err(api_error(error));
    }

    Ok(response.data.into_iter().map(to_candidate).collect())
}

fn to_candidate(track: dto::SearchTrack) -> SearchCandidate {
    SearchCandidate {
        source_id: SourceId::from(SOURCE_ID),
        external_id: track.id.map(|id| id.to_string()).unwrap_or_default(),
        title: track.title,
        artist: track.artist.map(|a| a.name).unwrap_or_default(),
        album_id: track.album.and_then(|a| a.id).map(|id| id.to_string()),
        // Deezer exposes no normalized relevance score.
        score: None,
    }
}

/// Build the session from `deezer.getUserData`.
pub fn to_session(response: dto::GatewayResponse<dto::UserData>) -> Result<Session, SourceError> {
    check_gateway_error(&response.error)?;
    let data = response
        .results
        .ok_or_else(|| SourceError::Login("empty user data".to_string()))?;

    let user_id = json_u64(&data.user.user_id).unwrap_or(0);
    if user_id == 0 {
        return Err(SourceError::Login(
            "arl was rejected (not logged in)".to_string(),
        ));
    }

    let license_token = data
        .user
        .options
        .license_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SourceError::Login("account has no streaming license".to_string()))?;

    Ok(Session {
        user_id,
        api_token: data.check_form,
        license_token,
    })
}

/// Extract the song data needed to request a stream.
pub fn to_song(response: dto::GatewayResponse<dto::SongData>) -> Result<dto::SongData, SourceError> {
    check_gateway_error(&response.error)?;
    response
        .results
        .ok_or_else(|| SourceError::NotFound("song data".to_string()))
}

/// Merge song and album metadata into file naming info.
pub fn to_file_info(
    candidate: &SearchCandidate,
    song: &dto::SongData,
    album: Option<&dto::Album>,
) -> TrackFileInfo {
    let title = non_empty(&song.title).unwrap_or(&candidate.title).to_string();
    let artist = non_empty(&song.artist).unwrap_or(&candidate.artist).to_string();

    TrackFileInfo {
        title,
        artist,
        album_artist: album
            .and_then(|a| a.artist.as_ref())
            .map(|a| a.name.clone())
            .filter(|n| !n.is_empty()),
        album: album
            .and_then(|a| a.title.clone())
            .or_else(|| song.album.clone()),
        track_number: song
            .track_number
            .as_ref()
            .and_then(json_u64)
            .and_then(|n| u32::try_from(n).ok()),
    }
}

/// Cover URL for an album, largest first.
pub fn cover_url(album: &dto::Album) -> Option<&str> {
    album.cover_xl.as_deref().or(album.cover_big.as_deref())
}

/// Formats to request for a quality setting, best first.
pub fn formats_for(quality: u8) -> &'static [&'static str] {
    match quality {
        0 => &["MP3_128"],
        1 => &["MP3_320", "MP3_128"],
        _ => &["FLAC", "MP3_320", "MP3_128"],
    }
}

/// Build the media service request for one track.
pub fn media_request(license_token: &str, track_token: &str, quality: u8) -> dto::MediaRequest {
    dto::MediaRequest {
        license_token: license_token.to_string(),
        media: vec![dto::MediaSpec {
            kind: "FULL".to_string(),
            formats: formats_for(quality)
                .iter()
                .map(|format| dto::CipherFormat {
                    cipher: super::CIPHER.to_string(),
                    format: format.to_string(),
                })
                .collect(),
        }],
        track_tokens: vec![track_token.to_string()],
    }
}

/// Pick the stream URL and format from a media response.
pub fn to_stream(response: dto::MediaResponse) -> Result<(String, String), SourceError> {
    let data = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::Unavailable("no media returned".to_string()))?;

    if let Some(error) = data.errors.first() {
        return Err(SourceError::Unavailable(format!(
            "{} (code {})",
            error.message, error.code
        )));
    }

    // The official client always uses the first medium and its first source.
    let medium = data
        .media
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::Unavailable("no medium for track".to_string()))?;

    if let Some(ref cipher) = medium.cipher
        && cipher.kind != super::CIPHER
    {
        return Err(SourceError::Decrypt(format!("unsupported cipher {}", cipher.kind)));
    }

    let source = medium
        .sources
        .into_iter()
        .next()
        .ok_or_else(|| SourceError::Unavailable("no source URL for track".to_string()))?;

    Ok((source.url, medium.format))
}

/// File extension for a Deezer format name.
pub fn extension_for(format: &str) -> &'static str {
    if format.starts_with("FLAC") { "flac" } else { "mp3" }
}

fn check_gateway_error(error: &serde_json::Value) -> Result<(), SourceError> {
    let has_error = match error {
        serde_json::Value::Array(items) => !items.is_empty(),
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => false,
    };
    if has_error {
        return Err(SourceError::Api(error.to_string()));
    }
    Ok(())
}

fn api_error(error: dto::ApiError) -> SourceError {
    match error.code {
        // Quota exceeded
        Some(4) => SourceError::RateLimited,
        // No data
        Some(800) => SourceError::NotFound(error.message),
        _ => SourceError::Api(error.message),
    }
}

fn json_u64(value: &serde_json::Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

fn non_empty(value: &str) -> Option<&str> {
    if value.trim().is_empty() { None } else { Some(value) }
}
