//! Qobuz source
//!
//! Requires an app id, at least one app secret and a subscribed account.

mod adapter;
mod client;
pub mod dto;

pub use client::QobuzClient;

/// Identifier used in `sources.priority` and in outcomes.
pub const SOURCE_ID: &str = "qobuz";
