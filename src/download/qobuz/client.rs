//! Qobuz HTTP client
//!
//! ## Session
//! Login exchanges email + MD5(password), or a user id + auth token, for a
//! `user_auth_token` sent as `X-User-Auth-Token` on every later request
//! together with `X-App-Id`.
//!
//! ## Signed requests
//! `track/getFileUrl` must be signed with one of the app's secrets:
//! `request_sig = md5("trackgetFileUrlformat_id{f}intentstreamtrack_id{id}{ts}{secret}")`.
//! Secrets rotate, so login signs a request for a known track with each
//! configured secret and keeps the first one the API accepts. HTTP 400 means
//! a wrong signature; other failures are logged and the next secret is tried.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use md5::{Digest, Md5};
use serde::de::DeserializeOwned;

use super::{adapter, dto};
use crate::config::QobuzConfig;
use crate::download::artwork;
use crate::download::domain::{FetchOutcome, SearchCandidate, SourceError};
use crate::download::files::{FileLayout, PartialFile, find_existing, with_extension};

const BASE_URL: &str = "https://www.qobuz.com/api.json/0.2";

/// Results requested per search; only the top one is ever matched.
const SEARCH_LIMIT: &str = "10";

/// Track signed with each app secret to find a valid one
const SECRET_CHECK_TRACK_ID: &str = "5966783";
const SECRET_CHECK_FORMAT_ID: u32 = 5;

#[derive(Debug, Clone)]
struct Session {
    app_id: String,
    auth_token: String,
    secret: String,
}

/// Qobuz client
pub struct QobuzClient {
    config: QobuzConfig,
    layout: FileLayout,
    save_artwork: bool,
    http_client: reqwest::Client,
    session: Option<Session>,
    base_url: String,
}

impl QobuzClient {
    pub fn new(config: QobuzConfig, layout: FileLayout, save_artwork: bool) -> Self {
        let http_client = reqwest::Client::builder()
            .gzip(true)
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
            session: None,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(config: QobuzConfig, base_url: impl Into<String>) -> Self {
        let mut client = Self::new(config, FileLayout::default(), false);
        client.base_url = base_url.into();
        client
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// Authenticate and select a working app secret.
    pub async fn login(&mut self) -> Result<(), SourceError> {
        self.session = None;

        let app_id = required(&self.config.app_id, "app_id")?;
        let user = required(&self.config.email_or_userid, "email_or_userid")?;
        let password = required(&self.config.password_or_token, "password_or_token")?;
        if self.config.secrets.iter().all(|s| s.trim().is_empty()) {
            return Err(SourceError::Login("no app secrets configured".to_string()));
        }

        let credentials = if self.config.use_auth_token {
            [("user_id", user), ("user_auth_token", password)]
        } else {
            let hashed = format!("{:x}", Md5::digest(password.as_bytes()));
            [("email", user), ("password", hashed)]
        };

        let response = self
            .http_client
            .get(format!("{}/user/login", self.base_url))
            .header("X-App-Id", app_id.as_str())
            .query(&credentials)
            .query(&[("app_id", app_id.as_str())])
            .send()
            .await?;

        let response: dto::LoginResponse = match check_status(response).await {
            Ok(response) => parse_json(response).await?,
            Err(SourceError::Login(message)) => {
                return Err(SourceError::Login(format!("invalid credentials: {}", message)));
            }
            Err(SourceError::Api(message)) => {
                return Err(SourceError::Login(format!("invalid app id: {}", message)));
            }
            Err(e) => return Err(e),
        };
        let auth_token = adapter::to_auth_token(response)?;

        let secret = self.find_secret(&app_id, &auth_token).await?;
        tracing::debug!("Qobuz session established");

        self.session = Some(Session {
            app_id,
            auth_token,
            secret,
        });
        Ok(())
    }

    /// Search the catalogue, keeping Qobuz's ranking.
    pub async fn search_tracks(&self, query: &str) -> Result<Vec<SearchCandidate>, SourceError> {
        let session = self.session.as_ref().ok_or(SourceError::NotLoggedIn)?;

        let response = self
            .get(session, "track/search")
            .query(&[("query", query), ("limit", SEARCH_LIMIT)])
            .send()
            .await?;

        let response: dto::SearchResponse = parse_json(check_status(response).await?).await?;
        Ok(adapter::to_candidates(response))
    }

    /// Resolve metadata, then download the track into `destination`.
    pub async fn fetch_track(
        &self,
        candidate: &SearchCandidate,
        destination: &Path,
    ) -> Result<FetchOutcome, SourceError> {
        if let Some(existing) = self.layout.existing_for_candidate(destination, candidate) {
            return Ok(FetchOutcome::AlreadyExists(existing));
        }
        let session = self.session.as_ref().ok_or(SourceError::NotLoggedIn)?;

        let response = self
            .get(session, "track/get")
            .query(&[("track_id", candidate.external_id.as_str())])
            .send()
            .await?;
        let track: dto::Track = parse_json(check_status(response).await?).await?;

        let info = adapter::to_file_info(candidate, &track);
        let stem = self.layout.relative_stem(&info);
        if let Some(existing) = find_existing(destination, &stem) {
            return Ok(FetchOutcome::AlreadyExists(existing));
        }

        if self.save_artwork
            && let (Some(cover), Some(album_id)) =
                (adapter::cover_url(&track), candidate.album_id.as_deref())
        {
            let key = format!("{}-{}", super::SOURCE_ID, album_id);
            if let Err(e) = artwork::save_cover(&self.http_client, cover, destination, &key).await {
                tracing::warn!("Could not save cover art for album {}: {}", album_id, e);
            }
        }

        let format_id = adapter::format_id(self.config.quality);
        let response = self
            .file_url(session, &session.secret, &candidate.external_id, format_id)
            .await?;
        let file_url: dto::FileUrlResponse = parse_json(check_status(response).await?).await?;
        let (url, extension) = adapter::to_stream(file_url)?;

        let path = with_extension(&destination.join(&stem), extension);
        tracing::debug!("Downloading {} (format {}) to {:?}", info.title, format_id, path);
        let path = self.download(&url, path).await?;
        Ok(FetchOutcome::Fetched(path))
    }

    /// Return the first configured secret that produces a valid signature.
    async fn find_secret(&self, app_id: &str, auth_token: &str) -> Result<String, SourceError> {
        let unsigned = Session {
            app_id: app_id.to_string(),
            auth_token: auth_token.to_string(),
            secret: String::new(),
        };

        for secret in self.config.secrets.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let status = match self
                .file_url(&unsigned, secret, SECRET_CHECK_TRACK_ID, SECRET_CHECK_FORMAT_ID)
                .await
            {
                Ok(response) => response.status(),
                Err(e) => {
                    tracing::warn!("Qobuz app secret check failed, trying next: {}", e);
                    continue;
                }
            };

            match adapter::secret_check(status) {
                adapter::SecretCheck::Valid => return Ok(secret.to_string()),
                adapter::SecretCheck::Rejected => {
                    tracing::debug!("Qobuz app secret rejected, trying next");
                }
                adapter::SecretCheck::Inconclusive => {
                    tracing::warn!("Qobuz app secret check returned HTTP {}, trying next", status);
                }
            }
        }

        Err(SourceError::Login("none of the app secrets are valid".to_string()))
    }

    async fn file_url(
        &self,
        session: &Session,
        secret: &str,
        track_id: &str,
        format_id: u32,
    ) -> Result<reqwest::Response, SourceError> {
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = request_signature(track_id, format_id, &timestamp, secret);
        let format_id = format_id.to_string();

        let response = self
            .get(session, "track/getFileUrl")
            .query(&[
                ("request_ts", timestamp.as_str()),
                ("request_sig", signature.as_str()),
                ("track_id", track_id),
                ("format_id", format_id.as_str()),
                ("intent", "stream"),
            ])
            .send()
            .await?;
        Ok(response)
    }

    async fn download(&self, url: &str, path: PathBuf) -> Result<PathBuf, SourceError> {
        let response = check_status(self.http_client.get(url).send().await?).await?;

        let mut file = PartialFile::create(path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }

        file.finish().await
    }

    fn get(&self, session: &Session, endpoint: &str) -> reqwest::RequestBuilder {
        self.http_client
            .get(format!("{}/{}", self.base_url, endpoint))
            .header("X-App-Id", session.app_id.as_str())
            .header("X-User-Auth-Token", session.auth_token.as_str())
    }
}

/// Signature for `track/getFileUrl`.
fn request_signature(track_id: &str, format_id: u32, timestamp: &str, secret: &str) -> String {
    let payload = format!(
        "trackgetFileUrlformat_id{}intentstreamtrack_id{}{}{}",
        format_id, track_id, timestamp, secret
    );
    format!("{:x}", Md5::digest(payload.as_bytes()))
}

fn required(value: &Option<String>, name: &str) -> Result<String, SourceError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SourceError::Login(format!("qobuz.{} is not configured", name)))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<dto::ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());

    Err(match status {
        reqwest::StatusCode::BAD_REQUEST => SourceError::Api(message),
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
            SourceError::Login(message)
        }
        reqwest::StatusCode::NOT_FOUND => SourceError::NotFound(message),
        reqwest::StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited,
        _ => SourceError::Network(format!(
            "HTTP {}: {} - {}",
            status,
            status.canonical_reason().unwrap_or("Unknown"),
            message
        )),
    })
}

async fn parse_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SourceError> {
    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Parse(e.to_string()))
}
