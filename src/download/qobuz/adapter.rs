//! Adapter layer: Convert Qobuz DTOs to domain models
//!
//! This is the ONLY place where Qobuz DTO types are converted to domain types.

use super::SOURCE_ID;
use super::dto;
use crate::download::domain::{SearchCandidate, SourceError, SourceId};
use crate::download::files::TrackFileInfo;

/// Convert a search response to candidates, keeping Qobuz's ranking.
pub fn to_candidates(response: dto::SearchResponse) -> Vec<SearchCandidate> {
    response
        .tracks
        .map(|page| page.items)
        .unwrap_or_default()
        .into_iter()
        .map(to_candidate)
        .collect()
}

fn to_candidate(track: dto::Track) -> SearchCandidate {
    SearchCandidate {
        source_id: SourceId::from(SOURCE_ID),
        external_id: track.id.map(|id| id.to_string()).unwrap_or_default(),
        title: track.title,
        artist: track.performer.map(|p| p.name).unwrap_or_default(),
        album_id: track.album.and_then(|a| a.id).filter(|id| !id.is_empty()),
        score: None,
    }
}

/// Extract the user auth token from a login response.
///
/// Free accounts log in fine but cannot stream full tracks.
pub fn to_auth_token(response: dto::LoginResponse) -> Result<String, SourceError> {
    let subscribed = response
        .user
        .as_ref()
        .and_then(|u| u.credential.as_ref())
        .is_some_and(|c| c.parameters.as_ref().is_some_and(|p| !p.is_null()));
    if !subscribed {
        return Err(SourceError::Login(
            "free accounts are not eligible to download tracks".to_string(),
        ));
    }

    response
        .user_auth_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SourceError::Login("no user auth token returned".to_string()))
}

/// How a signed `track/getFileUrl` answer judges an app secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretCheck {
    /// The signature was accepted
    Valid,
    /// Qobuz answered 400: the signature is wrong for this secret
    Rejected,
    /// Any other status says nothing about the secret
    Inconclusive,
}

/// Classify the status of a signed request made with a candidate secret.
pub fn secret_check(status: reqwest::StatusCode) -> SecretCheck {
    if status.is_success() {
        SecretCheck::Valid
    } else if status == reqwest::StatusCode::BAD_REQUEST {
        SecretCheck::Rejected
    } else {
        SecretCheck::Inconclusive
    }
}

/// Naming info for a track from `track/get`.
pub fn to_file_info(candidate: &SearchCandidate, track: &dto::Track) -> TrackFileInfo {
    let title = if track.title.trim().is_empty() {
        candidate.title.clone()
    } else {
        track.title.clone()
    };
    let artist = track
        .performer
        .as_ref()
        .map(|p| p.name.clone())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| candidate.artist.clone());

    TrackFileInfo {
        title,
        artist,
        album_artist: track
            .album
            .as_ref()
            .and_then(|a| a.artist.as_ref())
            .map(|a| a.name.clone())
            .filter(|n| !n.is_empty()),
        album: track.album.as_ref().and_then(|a| a.title.clone()),
        track_number: track.track_number,
    }
}

/// Cover URL for the track's album.
pub fn cover_url(track: &dto::Track) -> Option<&str> {
    let image = track.album.as_ref()?.image.as_ref()?;
    image.large.as_deref().or(image.small.as_deref())
}

/// Qobuz `format_id` for a quality setting.
pub fn format_id(quality: u8) -> u32 {
    match quality {
        0 | 1 => 5,
        2 => 6,
        3 => 7,
        _ => 27,
    }
}

/// Stream URL and file extension, rejecting previews.
pub fn to_stream(response: dto::FileUrlResponse) -> Result<(String, &'static str), SourceError> {
    if response.sample.unwrap_or(false) {
        let reason = response
            .restrictions
            .first()
            .map(|r| r.code.clone())
            .unwrap_or_else(|| "only a preview is available".to_string());
        return Err(SourceError::Unavailable(reason));
    }

    let url = response
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| SourceError::Unavailable("no file URL returned".to_string()))?;

    let extension = match (response.mime_type.as_deref(), response.format_id) {
        (Some("audio/mpeg"), _) | (None, Some(5)) => "mp3",
        _ => "flac",
    };
    Ok((url, extension))
}
