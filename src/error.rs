//! Application-wide error types.
//!
//! Library modules use specific error types via `thiserror`, while the
//! CLI/main edge uses `anyhow` for convenient error propagation.
//!
//! # Design
//!
//! - [`Error`]: Top-level application error enum
//! - Module-specific errors ([`SourceError`], [`CatalogueError`],
//!   [`ConfigError`]) for detailed handling
//! - Per-track failures never reach this type: the resolver turns them into
//!   [`ResolutionOutcome`](crate::download::ResolutionOutcome) values.
//!
//! [`SourceError`]: crate::download::SourceError
//! [`CatalogueError`]: crate::catalogue::CatalogueError
//! [`ConfigError`]: crate::config::ConfigError

use std::path::PathBuf;

use crate::catalogue::CatalogueError;
use crate::config::ConfigError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Catalogue credentials are missing or were rejected. Fatal for the run.
    #[error("Credential error: {0}")]
    Credential(String),

    /// Catalogue lookup failed
    #[error("Catalogue error: {0}")]
    Catalogue(CatalogueError),

    /// Output directory is unusable
    #[error("Output directory {path} is not usable: {message}")]
    OutputDir { path: PathBuf, message: String },

    /// Playlist file could not be written
    #[error("Playlist error: {0}")]
    Playlist(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl From<CatalogueError> for Error {
    fn from(err: CatalogueError) -> Self {
        match err {
            CatalogueError::Credentials(message) => Self::Credential(message),
            other => Self::Catalogue(other),
        }
    }
}

impl Error {
    /// Create a credential error.
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential(message.into())
    }

    /// Create an output directory error.
    pub fn output_dir(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::OutputDir {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a playlist error.
    pub fn playlist(message: impl Into<String>) -> Self {
        Self::Playlist(message.into())
    }

    /// Whether this error means required credentials could not be established.
    pub fn is_credential(&self) -> bool {
        match self {
            Self::Credential(_) => true,
            Self::WithContext { source, .. } => source.is_credential(),
            _ => false,
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, CatalogueError> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::from(e).context(ctx))
    }
}
