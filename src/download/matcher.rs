//! Candidate matching.
//!
//! Sources return relevance-ranked results, so only the top candidate is
//! evaluated. A match requires:
//! - exact title equality after lower-casing and trimming (no fuzzy scoring),
//! - the candidate's single artist being one of the query's artists
//!   (case-insensitive, order-insensitive),
//! - a resolvable identity (track id and album id).
//!
//! A free-text query has no fields to compare, so its top candidate only
//! needs a resolvable identity.
//!
//! Confidence is 1.0 unless the adapter supplied the source's own relevance
//! score, in which case that score (clamped to `[0, 1]`) is used. Comparing
//! it with the acceptance threshold is the resolver's job.

use super::domain::{MatchResult, SearchCandidate, TrackQuery};

/// Confidence for a match when the source exposes no score of its own.
const EXACT_MATCH_CONFIDENCE: f32 = 1.0;

/// Match `query` against a source's ranked `candidates`.
pub fn match_candidates(query: &TrackQuery, candidates: &[SearchCandidate]) -> MatchResult {
    let Some(top) = candidates.first() else {
        return MatchResult::NoMatch;
    };

    if !query.is_free_text() {
        let title_match = normalize(&top.title) == normalize(query.title());
        let artist_match = artist_in_set(&top.artist, query.artists());

        if !title_match || !artist_match {
            tracing::debug!(
                title_match,
                artist_match,
                "Top candidate rejected for '{}': {}",
                query,
                top
            );
            return MatchResult::NoMatch;
        }
    }

    if !top.is_resolvable() {
        tracing::debug!("Top candidate matched but lacks track/album id: {}", top);
        return MatchResult::NoMatch;
    }

    let confidence = top
        .score
        .filter(|s| s.is_finite())
        .map_or(EXACT_MATCH_CONFIDENCE, |s| s.clamp(0.0, 1.0));

    MatchResult::Matched {
        candidate: top.clone(),
        confidence,
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

fn artist_in_set(artist: &str, artists: &[String]) -> bool {
    let artist = normalize(artist);
    artists.iter().any(|a| normalize(a) == artist)
}
