//! Fallback resolution of one track across prioritized sources.
//!
//! For each source in priority order:
//! 1. skip it if its login failed,
//! 2. search with `"<artists> - <title>"`,
//! 3. match the top result ([`match_candidates`]),
//! 4. fetch when confidence reaches the threshold.
//!
//! The first fetch that succeeds or finds an existing file ends the walk; an
//! existing file is never re-fetched from a later source. Every other result
//! (search error, no results, no match, low confidence, fetch error) moves on
//! to the next source. There are no retries within a source.

use std::path::PathBuf;

use super::domain::{
    FetchOutcome, MatchResult, ResolutionOutcome, SearchCandidate, SourceId, TrackQuery,
};
use super::matcher::match_candidates;
use super::traits::SourceAdapter;

/// Default minimum confidence for fetching a match.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.85;

/// Settings fixed for the duration of a run.
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Minimum confidence to fetch (compared with `>=`)
    pub confidence_threshold: f32,
    /// Folder receiving every downloaded file
    pub destination: PathBuf,
}

struct SourceSlot {
    adapter: Box<dyn SourceAdapter>,
    usable: bool,
}

/// Result of trying one source.
enum Attempt {
    /// Terminal outcome reached
    Done(ResolutionOutcome),
    /// Source was queried without success
    Exhausted,
}

/// Resolves tracks against logged-in source sessions.
///
/// Owns the sessions: they are opened once in [`connect`](Self::connect) and
/// released when the resolver is dropped.
pub struct FallbackResolver {
    slots: Vec<SourceSlot>,
    settings: ResolverSettings,
}

impl FallbackResolver {
    /// Log in to every source, in priority order.
    ///
    /// A failed login only disables that source.
    pub async fn connect(adapters: Vec<Box<dyn SourceAdapter>>, settings: ResolverSettings) -> Self {
        let mut slots = Vec::with_capacity(adapters.len());

        for mut adapter in adapters {
            let id = adapter.id();
            let usable = match adapter.login().await {
                Ok(()) => {
                    tracing::info!("Logged in to {}", id);
                    true
                }
                Err(e) => {
                    tracing::warn!("Login to {} failed, skipping it for this run: {}", id, e);
                    false
                }
            };
            slots.push(SourceSlot { adapter, usable });
        }

        Self { slots, settings }
    }

    /// Sources still usable this run, in priority order.
    pub fn usable_sources(&self) -> Vec<SourceId> {
        self.slots
            .iter()
            .filter(|s| s.usable)
            .map(|s| s.adapter.id())
            .collect()
    }

    /// Walk the sources for `query` until one yields a file.
    pub async fn resolve(&self, query: &TrackQuery) -> ResolutionOutcome {
        let search = query.search_query();
        let mut attempted = Vec::new();

        for slot in self.slots.iter().filter(|s| s.usable) {
            let id = slot.adapter.id();
            attempted.push(id.clone());

            match self.try_source(slot.adapter.as_ref(), &id, query, &search).await {
                Attempt::Done(outcome) => return outcome,
                Attempt::Exhausted => continue,
            }
        }

        tracing::error!("Download FAILED for: {} on available sources", search);
        ResolutionOutcome::Failed {
            attempted_sources: attempted,
        }
    }

    async fn try_source(
        &self,
        adapter: &dyn SourceAdapter,
        id: &SourceId,
        query: &TrackQuery,
        search: &str,
    ) -> Attempt {
        tracing::info!("Trying source: {}", id);

        let candidates = match adapter.search(search).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!("Search on {} failed for '{}': {}", id, search, e);
                return Attempt::Exhausted;
            }
        };
        tracing::debug!("{} returned {} result(s) for '{}'", id, candidates.len(), search);

        if candidates.is_empty() {
            tracing::warn!("No search results for '{}' on {}", search, id);
            return Attempt::Exhausted;
        }

        let (candidate, confidence) = match match_candidates(query, &candidates) {
            MatchResult::Matched {
                candidate,
                confidence,
            } => (candidate, confidence),
            MatchResult::NoMatch => {
                tracing::warn!(
                    "No exact match on {} for '{}' (top result: {})",
                    id,
                    search,
                    describe_top(&candidates)
                );
                return Attempt::Exhausted;
            }
        };

        if confidence < self.settings.confidence_threshold {
            tracing::warn!(
                "Match on {} below confidence threshold ({:.2} < {:.2}): {}",
                id,
                confidence,
                self.settings.confidence_threshold,
                candidate
            );
            return Attempt::Exhausted;
        }

        match adapter
            .resolve_and_fetch(&candidate, &self.settings.destination)
            .await
        {
            Ok(FetchOutcome::Fetched(path)) => {
                tracing::info!("Download SUCCEEDED ({}): {:?}", id, path);
                Attempt::Done(ResolutionOutcome::Success {
                    path,
                    source_id: id.clone(),
                })
            }
            Ok(FetchOutcome::AlreadyExists(path)) => {
                tracing::info!("Already downloaded ({}): {:?}", id, path);
                Attempt::Done(ResolutionOutcome::AlreadyExists {
                    path,
                    source_id: id.clone(),
                })
            }
            Err(e) => {
                tracing::error!("Fetching {} from {} failed: {}", candidate, id, e);
                Attempt::Exhausted
            }
        }
    }
}

fn describe_top(candidates: &[SearchCandidate]) -> String {
    candidates
        .first()
        .map(|c| format!("{} by {}", c.title, c.artist))
        .unwrap_or_default()
}
