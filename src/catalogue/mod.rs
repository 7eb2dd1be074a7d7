//! Catalogue lookup - turns a reference into the tracks to download.
//!
//! # Architecture
//!
//! - **Domain models** (`domain.rs`) - [`Collection`], [`Reference`], [`CatalogueError`]
//! - **Trait** (`traits.rs`) - [`CatalogueApi`], mocked in tests
//! - **Spotify** (`spotify/`) - DTOs, adapter and HTTP client
//! - **Free text** (`free_text.rs`) - search text straight to the sources,
//!   used when no Spotify credentials are configured
//!
//! # Usage
//!
//! ```ignore
//! let catalogue = SpotifyClient::connect(&config.spotify).await?;
//! let collection = catalogue.resolve("https://open.spotify.com/playlist/...").await?;
//! for track in &collection.tracks {
//!     println!("{}", track);
//! }
//! ```

pub mod domain;
pub mod free_text;
pub mod spotify;
pub mod traits;

pub use domain::{CatalogueError, Collection, CollectionKind, Reference};
pub use free_text::FreeTextCatalogue;
pub use spotify::SpotifyClient;
pub use traits::CatalogueApi;
