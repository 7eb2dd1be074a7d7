//! Configuration system using layered TOML files.
//!
//! Files are read from lowest to highest priority and merged key by key:
//! 1. `./mdl-config.toml` (current directory)
//! 2. `~/.mdl-config.toml` (home directory)
//! 3. OS-standard config directory:
//!    - Windows: %APPDATA%\music-downloader\config.toml
//!    - macOS: ~/Library/Application Support/music-downloader/config.toml
//!    - Linux: ~/.config/music-downloader/config.toml
//! 4. The file given with `--config`, if any
//!
//! Missing files are skipped. The merged [`Config`] is built once per run and
//! passed by reference to whatever needs it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::download::resolver::DEFAULT_CONFIDENCE_THRESHOLD;

/// Application name used for config and default download folders
pub const APP_NAME: &str = "music-downloader";

/// Config file name looked up in the current directory
const CWD_FILE_NAME: &str = "mdl-config.toml";

/// Config file name looked up in the home directory
const HOME_FILE_NAME: &str = ".mdl-config.toml";

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source order and matching policy
    pub sources: SourcesConfig,

    /// Where and how files are written
    pub downloads: DownloadsConfig,

    /// Album artwork side-fetch
    pub artwork: ArtworkConfig,

    /// Playlist file output
    pub playlist: PlaylistConfig,

    /// Catalogue credentials
    pub spotify: SpotifyCredentials,

    /// Deezer session settings
    pub deezer: DeezerConfig,

    /// Qobuz session settings
    pub qobuz: QobuzConfig,
}

/// Source priority and matching settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Sources to try, most preferred first
    pub priority: Vec<String>,

    /// Minimum match confidence to download (0.0 - 1.0)
    pub confidence_threshold: f32,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            priority: vec!["deezer".to_string(), "qobuz".to_string()],
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadsConfig {
    /// Download folder; a leading `~` is expanded
    pub folder: PathBuf,

    /// Pause between tracks in milliseconds (0 disables)
    pub delay_ms: u64,

    /// File name template, e.g. "{artist} - {title}"
    pub track_format: String,

    /// Folder template, e.g. "{albumartist}/{album}" (empty = flat)
    pub folder_format: String,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            folder: default_download_folder(),
            delay_ms: 1000,
            track_format: "{artist} - {title}".to_string(),
            folder_format: String::new(),
        }
    }
}

/// Artwork settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    /// Save album covers under `<folder>/.artwork`
    pub save_artwork: bool,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self { save_artwork: true }
    }
}

/// Playlist output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistConfig {
    /// File name used when the collection has no name of its own
    pub file_name: String,
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            file_name: "downloaded_playlist.m3u".to_string(),
        }
    }
}

/// Spotify Web API client credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl SpotifyCredentials {
    /// Both the client id and secret are set to something non-blank.
    pub fn is_configured(&self) -> bool {
        [&self.client_id, &self.client_secret]
            .iter()
            .all(|v| v.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Deezer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeezerConfig {
    /// `arl` session cookie
    pub arl: Option<String>,

    /// 0 = MP3 128, 1 = MP3 320, 2 = FLAC
    pub quality: u8,
}

impl Default for DeezerConfig {
    fn default() -> Self {
        Self {
            arl: None,
            quality: 1,
        }
    }
}

/// Qobuz settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QobuzConfig {
    pub email_or_userid: Option<String>,

    /// Plain password, or a user auth token when `use_auth_token` is set
    pub password_or_token: Option<String>,

    pub use_auth_token: bool,

    pub app_id: Option<String>,

    /// App secrets used to sign file URL requests; the first that works is kept
    pub secrets: Vec<String>,

    /// 1 = MP3 320, 2 = FLAC 16/44.1, 3 = FLAC 24/96, 4 = FLAC 24/192
    pub quality: u8,
}

impl Default for QobuzConfig {
    fn default() -> Self {
        Self {
            email_or_userid: None,
            password_or_token: None,
            use_auth_token: false,
            app_id: None,
            secrets: Vec::new(),
            quality: 2,
        }
    }
}

impl Config {
    /// Download folder with `~` expanded.
    pub fn download_folder(&self) -> PathBuf {
        expand_tilde(&self.downloads.folder)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.sources.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "sources.confidence_threshold must be between 0 and 1, got {}",
                threshold
            )));
        }
        if self.sources.priority.is_empty() {
            tracing::warn!("sources.priority is empty; no track can be downloaded");
        }
        Ok(())
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Standard config files, lowest priority first.
pub fn layer_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(CWD_FILE_NAME));
    }
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(HOME_FILE_NAME));
    }
    if let Some(dir) = config_dir() {
        paths.push(dir.join("config.toml"));
    }
    paths
}

/// Load the merged configuration from the standard locations plus `explicit`.
///
/// An explicit path must exist; standard locations are optional.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut paths = layer_paths();
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        paths.push(path.to_path_buf());
    }
    load_layers(&paths)
}

/// Merge the given files in order (later wins) into a config.
pub fn load_layers(paths: &[PathBuf]) -> Result<Config, ConfigError> {
    let mut merged = toml::Table::new();
    let mut loaded = 0;

    for path in paths {
        if !path.is_file() {
            tracing::debug!("No config file at {:?}", path);
            continue;
        }
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.clone(), e))?;
        let table: toml::Table =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.clone(), e))?;
        merge_tables(&mut merged, table);
        loaded += 1;
        tracing::info!("Loaded config from {:?}", path);
    }

    if loaded == 0 {
        tracing::info!("No config file found, using defaults");
    }

    let config: Config = toml::Value::Table(merged)
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Invalid(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Deep-merge `overlay` into `base`; overlay values win, nested tables merge.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let incoming = match value {
            toml::Value::Table(incoming) => incoming,
            other => {
                base.insert(key, other);
                continue;
            }
        };
        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge_tables(existing, incoming);
            continue;
        }
        base.insert(key, toml::Value::Table(incoming));
    }
}

fn default_download_folder() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Tests
// ============================================================================
