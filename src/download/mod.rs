//! Track download engine - resolves catalogue tracks into audio files.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - Our types, independent of any source API
//! - **Matcher** (`matcher.rs`) - Decides whether a source's top result is the track
//! - **Source interface** (`traits.rs`) - `login` / `search` / `resolve_and_fetch`
//! - **Sources** (`deezer/`, `qobuz/`) - DTOs, adapters and HTTP clients per source
//! - **Resolver** (`resolver.rs`) - Walks sources in priority order for one track
//! - **Batch** (`batch.rs`) - Runs the resolver over a whole playlist
//! - **Files** (`files.rs`) - Destination naming, skip-if-exists, atomic writes
//! - **Artwork** (`artwork.rs`) - Album cover side-fetch
//!
//! # Usage
//!
//! ```ignore
//! use download::{BatchOrchestrator, FallbackResolver, ResolverSettings};
//!
//! let sources = download::build_sources(&config);
//! let resolver = FallbackResolver::connect(sources, settings).await;
//! let result = BatchOrchestrator::new(resolver, delay).run(&tracks).await;
//! println!("{} downloaded", result.successes.len());
//! ```

pub mod artwork;
pub mod batch;
pub mod deezer;
pub mod domain;
pub mod files;
pub mod matcher;
pub mod qobuz;
pub mod resolver;
pub mod traits;

pub use batch::BatchOrchestrator;
pub use domain::{
    BatchResult, FetchOutcome, MatchResult, ResolutionOutcome, SearchCandidate, SourceError,
    SourceId, TrackQuery,
};
pub use resolver::{FallbackResolver, ResolverSettings};
pub use traits::SourceAdapter;

use crate::config::Config;
use files::FileLayout;

/// Build one adapter per name in `sources.priority`, keeping that order.
///
/// Unknown names are skipped with a warning.
pub fn build_sources(config: &Config) -> Vec<Box<dyn SourceAdapter>> {
    let layout = FileLayout {
        folder_format: config.downloads.folder_format.clone(),
        track_format: config.downloads.track_format.clone(),
    };

    let mut sources: Vec<Box<dyn SourceAdapter>> = Vec::new();
    for name in &config.sources.priority {
        match name.trim().to_lowercase().as_str() {
            deezer::SOURCE_ID => sources.push(Box::new(deezer::DeezerClient::new(
                config.deezer.clone(),
                layout.clone(),
                config.artwork.save_artwork,
            ))),
            qobuz::SOURCE_ID => sources.push(Box::new(qobuz::QobuzClient::new(
                config.qobuz.clone(),
                layout.clone(),
                config.artwork.save_artwork,
            ))),
            other => tracing::warn!("Unknown source '{}' in priority list, skipping", other),
        }
    }
    sources
}
