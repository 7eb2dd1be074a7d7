//! Test utilities and fixtures for music-downloader tests.
//!
//! # Example
//!
//! ```ignore
//! use music_downloader::test_utils::{candidate, query};
//!
//! let q = query("Hey Jude", &["The Beatles"]);
//! let c = candidate("deezer", "Hey Jude", "The Beatles");
//! ```

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::download::{SearchCandidate, SourceId, TrackQuery};

/// Build a track query from string slices.
pub fn query(title: &str, artists: &[&str]) -> TrackQuery {
    TrackQuery::new(title, artists.iter().map(|a| a.to_string()).collect())
}

/// Build a fully resolvable candidate with no source score.
///
/// Ids are derived from the title so different tracks never share one.
pub fn candidate(source: &str, title: &str, artist: &str) -> SearchCandidate {
    SearchCandidate {
        source_id: SourceId::from(source),
        external_id: format!("{source}-{}", title.to_lowercase().replace(' ', "-")),
        title: title.to_string(),
        artist: artist.to_string(),
        album_id: Some(format!("{source}-album-1")),
        score: None,
    }
}

/// Local HTTP server standing in for a remote API.
///
/// Binds a random port on 127.0.0.1 and shuts down when dropped.
pub struct TestServer {
    /// Base URL for requests, e.g. `http://127.0.0.1:12345`
    pub base_url: String,
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestServer {
    /// Serve the router built by `app`, which receives the server's base URL
    /// so responses can point back at it.
    pub async fn spawn(app: impl FnOnce(&str) -> axum::Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().expect("Failed to get local address");
        let base_url = format!("http://{}", addr);
        let router = app(&base_url);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            base_url,
            _shutdown_tx: shutdown_tx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_is_resolvable() {
        assert!(candidate("deezer", "Song", "Artist").is_resolvable());
    }

    #[tokio::test]
    async fn test_server_answers_on_its_base_url() {
        let server = TestServer::spawn(|_| {
            axum::Router::new().route("/ping", axum::routing::get(|| async { "pong" }))
        })
        .await;

        let body = reqwest::get(format!("{}/ping", server.base_url))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "pong");
    }

    #[test]
    fn test_query_keeps_artist_order() {
        let q = query("Song", &["First", "Second"]);
        assert_eq!(q.artists(), &["First".to_string(), "Second".to_string()]);
    }
}
