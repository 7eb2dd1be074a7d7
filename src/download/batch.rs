//! Sequential batch processing of catalogue tracks.
//!
//! Tracks are resolved one at a time, in catalogue order, against a single
//! set of source sessions. A panic while resolving one track is contained
//! here and counted as a failure; the batch always runs to the end.

use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;

use super::domain::{BatchResult, ResolutionOutcome, TrackQuery};
use super::resolver::FallbackResolver;

/// Runs the resolver over a list of tracks.
pub struct BatchOrchestrator {
    resolver: FallbackResolver,
    delay: Duration,
}

impl BatchOrchestrator {
    /// `delay` is inserted between items (not after the last) to respect rate limits.
    pub fn new(resolver: FallbackResolver, delay: Duration) -> Self {
        Self { resolver, delay }
    }

    /// Resolve every query in order and aggregate the outcomes.
    pub async fn run(&self, queries: &[TrackQuery]) -> BatchResult {
        let total = queries.len();
        let mut result = BatchResult::default();
        tracing::info!("Processing {} tracks...", total);

        for (i, query) in queries.iter().enumerate() {
            tracing::info!("--- Processing track {}/{}: {} ---", i + 1, total, query);

            match AssertUnwindSafe(self.resolver.resolve(query))
                .catch_unwind()
                .await
            {
                Ok(outcome) => {
                    log_outcome(query, &outcome);
                    result.record(&outcome);
                }
                Err(panic) => {
                    tracing::error!(
                        "Error processing track {}/{} ({}): {}",
                        i + 1,
                        total,
                        query,
                        panic_message(panic.as_ref())
                    );
                    result.record_crash();
                }
            }

            if i + 1 < total && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        result
    }
}

fn log_outcome(query: &TrackQuery, outcome: &ResolutionOutcome) {
    match outcome {
        ResolutionOutcome::Success { source_id, .. } => {
            tracing::info!("✓ {} ({})", query, source_id);
        }
        ResolutionOutcome::AlreadyExists { source_id, .. } => {
            tracing::info!("= {} already downloaded ({})", query, source_id);
        }
        ResolutionOutcome::Failed { attempted_sources } => {
            let tried: Vec<_> = attempted_sources.iter().map(|s| s.as_str()).collect();
            tracing::warn!("✗ {} (tried: {})", query, tried.join(", "));
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::resolver::{DEFAULT_CONFIDENCE_THRESHOLD, ResolverSettings};
    use crate::download::traits::SourceAdapter;
    use crate::download::traits::mocks::MockSource;
    use crate::test_utils::{candidate, query};
    use std::path::{Path, PathBuf};

    async fn orchestrator(dir: &Path, sources: Vec<Box<dyn SourceAdapter>>) -> BatchOrchestrator {
        let resolver = FallbackResolver::connect(
            sources,
            ResolverSettings {
                confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                destination: dir.to_path_buf(),
            },
        )
        .await;
        BatchOrchestrator::new(resolver, Duration::ZERO)
    }

    fn beatles_source(id: &str) -> MockSource {
        MockSource::with_candidates(
            id,
            vec![
                candidate(id, "Hey Jude", "The Beatles"),
                candidate(id, "Let It Be", "The Beatles"),
                candidate(id, "Yesterday", "The Beatles"),
            ],
        )
    }

    #[tokio::test]
    async fn test_successes_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let batch = orchestrator(dir.path(), vec![Box::new(beatles_source("deezer"))]).await;

        let queries = vec![
            query("Yesterday", &["The Beatles"]),
            query("Unknown Song", &["Nobody"]),
            query("Hey Jude", &["The Beatles"]),
        ];
        let result = batch.run(&queries).await;

        assert_eq!(
            result.successes,
            vec![
                dir.path().join("The Beatles - Yesterday.mp3"),
                dir.path().join("The Beatles - Hey Jude.mp3"),
            ]
        );
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.total_count, 3);
    }

    #[tokio::test]
    async fn test_panicking_item_does_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        let source = beatles_source("deezer").panicking_on("Let It Be");
        let batch = orchestrator(dir.path(), vec![Box::new(source)]).await;

        let queries = vec![
            query("Let It Be", &["The Beatles"]),
            query("Hey Jude", &["The Beatles"]),
        ];
        let result = batch.run(&queries).await;

        assert_eq!(result.successes, vec![dir.path().join("The Beatles - Hey Jude.mp3")]);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.total_count, 2);
    }

    #[tokio::test]
    async fn test_second_run_reports_already_present() {
        let dir = tempfile::tempdir().unwrap();
        let queries = vec![
            query("Hey Jude", &["The Beatles"]),
            query("Yesterday", &["The Beatles"]),
        ];

        let first = orchestrator(dir.path(), vec![Box::new(beatles_source("deezer"))])
            .await
            .run(&queries)
            .await;
        assert_eq!(first.successes.len(), 2);

        let source = beatles_source("deezer");
        let calls = source.calls();
        let second = orchestrator(dir.path(), vec![Box::new(source)])
            .await
            .run(&queries)
            .await;

        assert!(second.successes.is_empty());
        assert_eq!(second.already_present, 2);
        assert_eq!(second.failed_count, 0);
        assert_eq!(calls.fetches(), 2);

        let files: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let batch = orchestrator(dir.path(), vec![Box::new(MockSource::empty("deezer"))]).await;
        assert_eq!(batch.run(&[]).await, BatchResult::default());
    }

    #[tokio::test]
    async fn test_no_usable_sources_fails_every_track() {
        let dir = tempfile::tempdir().unwrap();
        let batch = orchestrator(
            dir.path(),
            vec![Box::new(MockSource::failing_login("deezer", vec![]))],
        )
        .await;

        let result = batch.run(&[query("Hey Jude", &["The Beatles"])]).await;
        assert_eq!(result.failed_count, 1);
        assert!(result.successes.is_empty());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::download::resolver::ResolverSettings;
    use crate::download::traits::mocks::MockSource;
    use crate::test_utils::{candidate, query};
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        /// `successes` is exactly the input-ordered subsequence of resolvable tracks.
        #[test]
        fn prop_successes_are_ordered_subsequence(known in prop::collection::vec(any::<bool>(), 0..8)) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            let dir = tempfile::tempdir().unwrap();

            let titles: Vec<String> = (0..known.len()).map(|i| format!("Song {i:02}")).collect();
            let candidates = titles
                .iter()
                .zip(&known)
                .filter(|(_, k)| **k)
                .map(|(t, _)| candidate("deezer", t, "Artist"))
                .collect();
            let queries: Vec<_> = titles.iter().map(|t| query(t, &["Artist"])).collect();

            let result = rt.block_on(async {
                let resolver = FallbackResolver::connect(
                    vec![Box::new(MockSource::with_candidates("deezer", candidates))],
                    ResolverSettings {
                        confidence_threshold: 0.85,
                        destination: dir.path().to_path_buf(),
                    },
                )
                .await;
                BatchOrchestrator::new(resolver, Duration::ZERO).run(&queries).await
            });

            let expected: Vec<_> = titles
                .iter()
                .zip(&known)
                .filter(|(_, k)| **k)
                .map(|(t, _)| dir.path().join(format!("Artist - {t}.mp3")))
                .collect();
            prop_assert_eq!(result.successes, expected);
            prop_assert_eq!(result.total_count, known.len());
        }
    }
}
