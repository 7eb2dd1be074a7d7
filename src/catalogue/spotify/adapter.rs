//! Adapter layer: Convert Spotify DTOs to domain models

use super::dto;
use crate::download::TrackQuery;

/// Convert a track, keeping every artist in catalogue order.
///
/// Returns `None` for entries that cannot be searched for (no title or no artists).
pub fn to_query(track: &dto::Track) -> Option<TrackQuery> {
    let artists: Vec<String> = track
        .artists
        .iter()
        .map(|a| a.name.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();

    if track.name.trim().is_empty() || artists.is_empty() {
        return None;
    }
    Some(TrackQuery::new(track.name.trim(), artists))
}

/// Convert a list of tracks, skipping unusable entries with a warning.
pub fn to_queries<'a>(tracks: impl IntoIterator<Item = &'a dto::Track>) -> Vec<TrackQuery> {
    tracks
        .into_iter()
        .filter_map(|track| {
            let query = to_query(track);
            if query.is_none() {
                tracing::warn!(
                    "Skipping catalogue entry without title or artists: {:?}",
                    track.id.as_deref().unwrap_or(&track.name)
                );
            }
            query
        })
        .collect()
}

/// Convert playlist items; removed tracks (`track: null`) are skipped.
pub fn playlist_queries(items: &[dto::PlaylistItem]) -> Vec<TrackQuery> {
    let skipped = items.iter().filter(|i| i.track.is_none()).count();
    if skipped > 0 {
        tracing::warn!("Skipping {} unavailable playlist entries", skipped);
    }
    to_queries(items.iter().filter_map(|item| item.track.as_ref()))
}
