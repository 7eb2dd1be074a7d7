//! Deezer HTTP client
//!
//! ## Session
//! Login sets the user's `arl` cookie and calls `deezer.getUserData` on the
//! gateway. The cookie store then carries the `sid` cookie the gateway hands
//! out, and the returned `checkForm` is sent as `api_token` on later gateway
//! calls. A `USER_ID` of 0 means the arl was rejected.
//!
//! ## Downloads
//! `song.getData` yields a track token, which the media service exchanges
//! for a CDN URL. The stream is stripe-encrypted (see `crypto`) and is
//! decrypted on the fly into a `.part` file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use reqwest::cookie::Jar;
use serde::de::DeserializeOwned;

use super::adapter::{self, Session};
use super::crypto::StripeDecryptor;
use super::dto;
use crate::config::DeezerConfig;
use crate::download::artwork;
use crate::download::domain::{FetchOutcome, SearchCandidate, SourceError};
use crate::download::files::{FileLayout, PartialFile, find_existing, with_extension};

const API_URL: &str = "https://api.deezer.com";
const GATEWAY_URL: &str = "https://www.deezer.com/ajax/gw-light.php";
const MEDIA_URL: &str = "https://media.deezer.com/v1/get_url";
const COOKIE_URL: &str = "https://www.deezer.com";

/// Results requested per search; only the top one is ever matched.
const SEARCH_LIMIT: &str = "10";

/// Deezer client
pub struct DeezerClient {
    config: DeezerConfig,
    layout: FileLayout,
    save_artwork: bool,
    http_client: reqwest::Client,
    cookies: Arc<Jar>,
    session: Option<Session>,
    api_url: String,
    gateway_url: String,
    media_url: String,
}

impl DeezerClient {
    pub fn new(config: DeezerConfig, layout: FileLayout, save_artwork: bool) -> Self {
        let cookies = Arc::new(Jar::default());
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .cookie_provider(cookies.clone())
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            config,
            layout,
            save_artwork,
            http_client,
            cookies,
            session: None,
            api_url: API_URL.to_string(),
            gateway_url: GATEWAY_URL.to_string(),
            media_url: MEDIA_URL.to_string(),
        }
    }

    /// Create a client for testing with custom base URLs
    #[cfg(test)]
    pub fn with_base_url(config: DeezerConfig, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let mut client = Self::new(config, FileLayout::default(), false);
        client.api_url = base_url.clone();
        client.gateway_url = format!("{}/ajax/gw-light.php", base_url);
        client.media_url = format!("{}/v1/get_url", base_url);
        client
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Authenticate with the configured arl.
    pub async fn login(&mut self) -> Result<(), SourceError> {
        self.session = None;

        let arl = self
            .config
            .arl
            .as_deref()
            .map(str::trim)
            .filter(|arl| !arl.is_empty())
            .ok_or_else(|| SourceError::Login("no arl configured".to_string()))?;

        let cookie_url =
            reqwest::Url::parse(COOKIE_URL).map_err(|e| SourceError::Login(e.to_string()))?;
        self.cookies
            .add_cookie_str(&format!("arl={}; Domain=.deezer.com; Path=/", arl), &cookie_url);

        let response: dto::GatewayResponse<dto::UserData> = self
            .gateway("deezer.getUserData", "null", serde_json::json!({}))
            .await?;
        let session = adapter::to_session(response)?;

        tracing::debug!("Deezer session established for user {}", session.user_id);
        self.session = Some(session);
        Ok(())
    }

    /// Search the public catalogue, keeping Deezer's ranking.
    pub async fn search_tracks(&self, query: &str) -> Result<Vec<SearchCandidate>, SourceError> {
        let url = format!("{}/search/track", self.api_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query), ("limit", SEARCH_LIMIT)])
            .send()
            .await?;

        let response: dto::SearchResponse = parse_json(check_status(response).await?).await?;
        adapter::to_candidates(response)
    }

    /// Resolve metadata, then download and decrypt the track into `destination`.
    pub async fn fetch_track(
        &self,
        candidate: &SearchCandidate,
        destination: &Path,
    ) -> Result<FetchOutcome, SourceError> {
        if let Some(existing) = self.layout.existing_for_candidate(destination, candidate) {
            return Ok(FetchOutcome::AlreadyExists(existing));
        }
        let session = self.session.as_ref().ok_or(SourceError::NotLoggedIn)?;

        let song: dto::GatewayResponse<dto::SongData> = self
            .gateway(
                "song.getData",
                &session.api_token,
                serde_json::json!({ "sng_id": candidate.external_id }),
            )
            .await?;
        let song = adapter::to_song(song)?;

        let album = match candidate.album_id.as_deref() {
            Some(album_id) => match self.album(album_id).await {
                Ok(album) => Some(album),
                Err(e) => {
                    tracing::debug!("Album metadata unavailable for {}: {}", album_id, e);
                    None
                }
            },
            None => None,
        };

        let info = adapter::to_file_info(candidate, &song, album.as_ref());
        let stem = self.layout.relative_stem(&info);
        if let Some(existing) = find_existing(destination, &stem) {
            return Ok(FetchOutcome::AlreadyExists(existing));
        }

        if self.save_artwork
            && let (Some(album), Some(album_id)) = (album.as_ref(), candidate.album_id.as_deref())
            && let Some(cover) = adapter::cover_url(album)
        {
            let key = format!("{}-{}", super::SOURCE_ID, album_id);
            if let Err(e) = artwork::save_cover(&self.http_client, cover, destination, &key).await {
                tracing::warn!("Could not save cover art for album {}: {}", album_id, e);
            }
        }

        let track_token = song
            .track_token
            .as_deref()
            .ok_or_else(|| SourceError::Unavailable("no track token".to_string()))?;
        let (url, format) = self.stream_url(session, track_token).await?;

        let path = with_extension(&destination.join(&stem), adapter::extension_for(&format));
        tracing::debug!("Downloading {} as {} to {:?}", info.title, format, path);
        let path = self.download(&url, &candidate.external_id, path).await?;
        Ok(FetchOutcome::Fetched(path))
    }

    async fn album(&self, album_id: &str) -> Result<dto::Album, SourceError> {
        let url = format!("{}/album/{}", self.api_url, urlencoding::encode(album_id));
        let response = self.http_client.get(&url).send().await?;
        let album: dto::Album = parse_json(check_status(response).await?).await?;

        match album.error {
            Some(error) => Err(SourceError::Api(error.message)),
            None => Ok(album),
        }
    }

    async fn stream_url(
        &self,
        session: &Session,
        track_token: &str,
    ) -> Result<(String, String), SourceError> {
        let request = adapter::media_request(&session.license_token, track_token, self.config.quality);
        let response = self
            .http_client
            .post(&self.media_url)
            .json(&request)
            .send()
            .await?;

        let response: dto::MediaResponse = parse_json(check_status(response).await?).await?;
        adapter::to_stream(response)
    }

    async fn download(
        &self,
        url: &str,
        track_id: &str,
        path: PathBuf,
    ) -> Result<PathBuf, SourceError> {
        let response = check_status(self.http_client.get(url).send().await?).await?;

        let mut decryptor = StripeDecryptor::new(track_id);
        let mut file = PartialFile::create(path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let plain = decryptor.update(&chunk?)?;
            file.write_all(&plain).await?;
        }
        file.write_all(&decryptor.finish()).await?;

        file.finish().await
    }

    async fn gateway<T: DeserializeOwned>(
        &self,
        method: &str,
        api_token: &str,
        body: serde_json::Value,
    ) -> Result<T, SourceError> {
        let response = self
            .http_client
            .post(&self.gateway_url)
            .query(&[
                ("method", method),
                ("input", "3"),
                ("api_version", "1.0"),
                ("api_token", api_token),
            ])
            .json(&body)
            .send()
            .await?;

        parse_json(check_status(response).await?).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS => Err(SourceError::RateLimited),
        reqwest::StatusCode::NOT_FOUND => Err(SourceError::NotFound(response.url().to_string())),
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => Err(
            SourceError::Login(format!("HTTP {}", status)),
        ),
        _ => {
            let body = response.text().await.unwrap_or_default();
            Err(SourceError::Network(format!(
                "HTTP {}: {} - {}",
                status,
                status.canonical_reason().unwrap_or("Unknown"),
                body.chars().take(200).collect::<String>()
            )))
        }
    }
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SourceError> {
    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::deezer::crypto::encrypt_stream;
    use crate::test_utils::{TestServer, candidate};
    use axum::extract::Query;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TRACK_ID: &str = "3135556";

    /// Plain audio spanning several stripes plus a partial tail.
    fn audio() -> Vec<u8> {
        (0..2048 * 4 + 300).map(|i| (i % 253) as u8).collect()
    }

    /// Stand-in for the gateway, public API, media service and CDN.
    /// `song_lookups` counts `song.getData` calls.
    fn deezer_api(base: &str, song_lookups: Arc<AtomicUsize>) -> Router {
        let stream_url = format!("{}/stream/{}", base, TRACK_ID);
        Router::new()
            .route(
                "/ajax/gw-light.php",
                post(move |Query(params): Query<HashMap<String, String>>| {
                    let song_lookups = Arc::clone(&song_lookups);
                    async move { Json(gateway_response(&params, &song_lookups)) }
                }),
            )
            .route(
                "/album/{id}",
                get(|| async {
                    Json(json!({"id": 302127, "title": "Discovery", "artist": {"name": "Daft Punk"}}))
                }),
            )
            .route(
                "/v1/get_url",
                post(move || {
                    let stream_url = stream_url.clone();
                    async move {
                        Json(json!({"data": [{"media": [{
                            "format": "MP3_320",
                            "cipher": {"type": "BF_CBC_STRIPE"},
                            "sources": [{"url": stream_url, "provider": "ak"}]
                        }]}]}))
                    }
                }),
            )
            .route(
                "/stream/{id}",
                get(|| async { encrypt_stream(TRACK_ID, &audio()) }),
            )
    }

    fn gateway_response(params: &HashMap<String, String>, song_lookups: &AtomicUsize) -> Value {
        let param = |name: &str| params.get(name).map(String::as_str).unwrap_or_default();
        match param("method") {
            "deezer.getUserData" => json!({
                "error": [],
                "results": {
                    "USER": {"USER_ID": 42, "OPTIONS": {"license_token": "license"}},
                    "checkForm": "form-token"
                }
            }),
            "song.getData" if param("api_token") == "form-token" => {
                song_lookups.fetch_add(1, Ordering::SeqCst);
                json!({
                    "error": [],
                    "results": {
                        "SNG_ID": TRACK_ID,
                        "SNG_TITLE": "Harder, Better, Faster, Stronger",
                        "ART_NAME": "Daft Punk",
                        "ALB_TITLE": "Discovery",
                        "TRACK_NUMBER": "4",
                        "TRACK_TOKEN": "track-token"
                    }
                })
            }
            _ => json!({"error": {"VALID_TOKEN_REQUIRED": "Invalid CSRF token"}, "results": {}}),
        }
    }

    fn harder_better() -> SearchCandidate {
        SearchCandidate {
            external_id: TRACK_ID.to_string(),
            album_id: Some("302127".to_string()),
            ..candidate("deezer", "Harder, Better, Faster, Stronger", "Daft Punk")
        }
    }

    fn with_arl() -> DeezerConfig {
        DeezerConfig {
            arl: Some("arl-cookie".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_client_creation() {
        let client = DeezerClient::new(DeezerConfig::default(), FileLayout::default(), true);
        assert_eq!(client.api_url, "https://api.deezer.com");
        assert!(!client.is_logged_in());
    }

    #[test]
    fn test_client_with_base_url() {
        let client = DeezerClient::with_base_url(DeezerConfig::default(), "http://localhost:8080");
        assert_eq!(client.gateway_url, "http://localhost:8080/ajax/gw-light.php");
        assert_eq!(client.media_url, "http://localhost:8080/v1/get_url");
    }

    #[tokio::test]
    async fn test_login_without_arl_fails() {
        let mut client = DeezerClient::with_base_url(DeezerConfig::default(), "http://127.0.0.1:9");
        assert!(matches!(client.login().await, Err(SourceError::Login(_))));
        assert!(!client.is_logged_in());
    }

    #[tokio::test]
    async fn test_fetch_requires_login() {
        let client = DeezerClient::with_base_url(DeezerConfig::default(), "http://127.0.0.1:9");
        let candidate = candidate("deezer", "Song", "Artist");
        let dir = tempfile::tempdir().unwrap();

        let result = client.fetch_track(&candidate, dir.path()).await;
        assert!(matches!(result, Err(SourceError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_fetch_decrypts_stream_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let server = TestServer::spawn(|base| deezer_api(base, Arc::default())).await;
        let mut client = DeezerClient::with_base_url(with_arl(), &server.base_url);
        client.login().await.unwrap();

        let outcome = client.fetch_track(&harder_better(), dir.path()).await.unwrap();
        let expected = dir.path().join("Daft Punk - Harder, Better, Faster, Stronger.mp3");
        assert_eq!(outcome, FetchOutcome::Fetched(expected.clone()));
        assert_eq!(std::fs::read(&expected).unwrap(), audio());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_existing_file_needs_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Daft Punk - Harder, Better, Faster, Stronger.flac");
        std::fs::write(&existing, b"old").unwrap();

        // Not logged in and nothing listening: any request would fail.
        let client = DeezerClient::with_base_url(with_arl(), "http://127.0.0.1:9");
        let outcome = client.fetch_track(&harder_better(), dir.path()).await.unwrap();
        assert_eq!(outcome, FetchOutcome::AlreadyExists(existing));
    }

    #[tokio::test]
    async fn test_existing_file_is_found_before_song_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("Daft Punk - Harder, Better, Faster, Stronger.mp3");
        std::fs::write(&existing, b"old").unwrap();

        let song_lookups = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&song_lookups);
        let server = TestServer::spawn(move |base| deezer_api(base, counter)).await;
        let mut client = DeezerClient::with_base_url(with_arl(), &server.base_url);
        client.login().await.unwrap();

        let outcome = client.fetch_track(&harder_better(), dir.path()).await.unwrap();
        assert_eq!(outcome, FetchOutcome::AlreadyExists(existing.clone()));
        assert_eq!(song_lookups.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read(&existing).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_album_layout_uses_looked_up_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let server = TestServer::spawn(|base| deezer_api(base, Arc::default())).await;
        let mut client = DeezerClient::with_base_url(with_arl(), &server.base_url);
        client.layout = FileLayout {
            folder_format: "{albumartist}/{album}".to_string(),
            track_format: "{tracknumber} - {title}".to_string(),
        };
        client.login().await.unwrap();

        let outcome = client.fetch_track(&harder_better(), dir.path()).await.unwrap();
        let expected = dir
            .path()
            .join("Daft Punk")
            .join("Discovery")
            .join("04 - Harder, Better, Faster, Stronger.mp3");
        assert_eq!(outcome, FetchOutcome::Fetched(expected));
    }
}
