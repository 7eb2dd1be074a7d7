//! CLI definition and the download command.
//!
//! The command is a thin shell around the library: load configuration,
//! resolve the reference through the catalogue, run the batch, print the
//! summary and write the playlist.

use clap::{ArgAction, Parser};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{error, info, warn};

use crate::catalogue::{CatalogueApi, CatalogueError, FreeTextCatalogue, Reference, SpotifyClient};
use crate::config::{self, Config};
use crate::download::{
    self, BatchOrchestrator, BatchResult, FallbackResolver, ResolverSettings, SourceAdapter,
};
use crate::error::Error;
use crate::playlist;

/// Music Downloader CLI
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Spotify track, playlist or album URL/URI, or a free-text search
    pub reference: String,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file applied on top of the standard locations
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output directory (overrides downloads.folder)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Spotify client id (or set SPOTIPY_CLIENT_ID env var)
    #[arg(long, env = "SPOTIPY_CLIENT_ID", hide_env_values = true)]
    pub spotify_client_id: Option<String>,

    /// Spotify client secret (or set SPOTIPY_CLIENT_SECRET env var)
    #[arg(long, env = "SPOTIPY_CLIENT_SECRET", hide_env_values = true)]
    pub spotify_client_secret: Option<String>,
}

impl Cli {
    /// Log filter directive for the requested verbosity.
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "music_downloader=info",
            1 => "music_downloader=debug",
            _ => "music_downloader=trace",
        }
    }
}

/// What a download run produced.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub result: BatchResult,
    pub playlist: Option<PathBuf>,
}

/// Run the CLI. Errors mean the run could not start (credentials or configuration).
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = load_config(cli)?;
    let rt = Runtime::new()?;

    rt.block_on(async {
        let catalogue = connect_catalogue(&config, &cli.reference).await?;
        let sources = download::build_sources(&config);

        tokio::select! {
            report = download_collection(catalogue.as_ref(), sources, &config, &cli.reference) => {
                report?;
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted, abandoning the current track");
                println!("\nInterrupted.");
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Load configuration and apply command-line overrides.
pub fn load_config(cli: &Cli) -> Result<Config, Error> {
    let mut config = config::load(cli.config.as_deref())?;

    if let Some(ref id) = cli.spotify_client_id {
        config.spotify.client_id = Some(id.clone());
    }
    if let Some(ref secret) = cli.spotify_client_secret {
        config.spotify.client_secret = Some(secret.clone());
    }
    if let Some(ref output) = cli.output {
        config.downloads.folder = output.clone();
    }

    config.validate()?;
    Ok(config)
}

/// Pick the catalogue for `reference`.
///
/// Links and URIs need Spotify. Free text uses Spotify when credentials are
/// configured and otherwise goes to the sources as typed.
pub async fn connect_catalogue(
    config: &Config,
    reference: &str,
) -> Result<Box<dyn CatalogueApi>, Error> {
    let free_text = matches!(Reference::parse(reference), Ok(Reference::Search(_)));
    if free_text && !config.spotify.is_configured() {
        info!("No Spotify credentials, searching the sources for '{}' directly", reference.trim());
        return Ok(Box::new(FreeTextCatalogue));
    }

    let client = SpotifyClient::connect(&config.spotify).await?;
    Ok(Box::new(client))
}

/// Resolve `reference`, download every track and write the playlist.
///
/// Only a credential failure or an unusable output directory is an error;
/// a reference that yields no tracks is a normal, empty run.
pub async fn download_collection(
    catalogue: &dyn CatalogueApi,
    sources: Vec<Box<dyn SourceAdapter>>,
    config: &Config,
    reference: &str,
) -> Result<DownloadReport, Error> {
    let collection = match catalogue.resolve(reference).await {
        Ok(collection) => collection,
        Err(CatalogueError::Credentials(message)) => return Err(Error::credential(message)),
        Err(e) => {
            error!("Could not resolve '{}': {}", reference, e);
            println!("No tracks found for '{}'.", reference);
            return Ok(DownloadReport::default());
        }
    };

    if collection.is_empty() {
        println!("No tracks found for '{}'.", reference);
        return Ok(DownloadReport::default());
    }
    info!(
        "Found {} tracks in {} {}",
        collection.tracks.len(),
        collection.kind,
        collection.name.as_deref().unwrap_or(reference)
    );

    let output_dir = prepare_output_dir(&config.download_folder())?;

    let settings = ResolverSettings {
        confidence_threshold: config.sources.confidence_threshold,
        destination: output_dir.clone(),
    };
    let resolver = FallbackResolver::connect(sources, settings).await;
    if resolver.usable_sources().is_empty() {
        warn!("No download source is available; every track will fail");
    }

    let orchestrator =
        BatchOrchestrator::new(resolver, Duration::from_millis(config.downloads.delay_ms));
    let result = orchestrator.run(&collection.tracks).await;
    // Release every source session before writing the playlist.
    drop(orchestrator);

    println!("{}", summary_line(&result));

    let file_name = playlist::playlist_file_name(collection.name.as_deref(), &config.playlist.file_name);
    let playlist = match playlist::write_m3u(&result.successes, &output_dir, &file_name) {
        Ok(path) => path,
        Err(e) => {
            error!("Could not write playlist: {}", e);
            None
        }
    };
    if let Some(ref path) = playlist {
        println!("Playlist: {}", path.display());
    }

    Ok(DownloadReport { result, playlist })
}

/// Final summary printed after a run.
pub fn summary_line(result: &BatchResult) -> String {
    format!(
        "Download summary: {} successful, {} already present, {} failed out of {} total",
        result.successes.len(),
        result.already_present,
        result.failed_count,
        result.total_count
    )
}

fn prepare_output_dir(path: &Path) -> Result<PathBuf, Error> {
    std::fs::create_dir_all(path).map_err(|e| Error::output_dir(path, e.to_string()))?;
    if !path.is_dir() {
        return Err(Error::output_dir(path, "not a directory"));
    }
    Ok(path.to_path_buf())
}
