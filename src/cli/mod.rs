//! Command-line interface for music-downloader.
//!
//! One positional reference (URL, URI or search text) plus flags for
//! verbosity, configuration file and output directory.

mod commands;

pub use commands::{Cli, DownloadReport, download_collection, run_command, summary_line};
