//! Music Downloader - fetch catalogue playlists from fallback download sources.
//!
//! A Spotify track, playlist or album (or a free-text search) is resolved to
//! an ordered track list. Each track is then searched on the configured
//! sources in priority order, matched against the source's top result, and
//! downloaded from the first source that has it. Successful downloads are
//! collected into an M3U playlist.

pub mod catalogue;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod playlist;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging; RUST_LOG directives are kept, verbosity adds ours.
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive(args.log_directive().parse()?))
        .init();

    cli::run_command(&args)
}
