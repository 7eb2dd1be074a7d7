//! Deezer source
//!
//! Search uses the public API; downloads need a logged-in session (arl cookie).

mod adapter;
mod client;
mod crypto;
pub mod dto;

pub use client::DeezerClient;

/// Identifier used in `sources.priority` and in outcomes.
pub const SOURCE_ID: &str = "deezer";

/// Cipher requested from and expected back from the media service.
const CIPHER: &str = "BF_CBC_STRIPE";
