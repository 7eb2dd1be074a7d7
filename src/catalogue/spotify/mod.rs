//! Spotify Web API integration
//!
//! Resolves track, playlist and album references and free-text searches.
//! API docs: https://developer.spotify.com/documentation/web-api

mod adapter;
mod client;
pub mod dto;

pub use client::SpotifyClient;
