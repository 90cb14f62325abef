//! Spotify Web API fetcher.
//!
//! Authenticates with the client-credentials flow and reads public
//! playlists through `/v1/playlists/{id}`, following `tracks.next` until the
//! item list is complete.

use super::PlaylistFetcher;
use crate::error::{FetchError, FetchResult, MonitorError, MonitorResult};
use async_trait::async_trait;
use heylisten_types::{Item, PlaylistId, Snapshot, UNKNOWN_ITEM_ID};
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Attempts per request while the service answers 429.
const MAX_RATE_LIMIT_ATTEMPTS: u32 = 3;

/// Seconds subtracted from a token's lifetime before it is refreshed.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 60;

/// Spotify specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// OAuth2 client ID.
    pub client_id: String,
    /// OAuth2 client secret.
    pub client_secret: String,
    /// Base URL for the Web API (e.g. `https://api.spotify.com`).
    pub api_base_url: String,
    /// Base URL for the accounts service (e.g. `https://accounts.spotify.com`).
    pub accounts_base_url: String,
    /// Timeout for a single HTTP request.
    pub request_timeout_secs: u64,
    /// Upper bound on a single `Retry-After` wait.
    pub max_retry_wait_secs: u64,
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            api_base_url: "https://api.spotify.com".to_string(),
            accounts_base_url: "https://accounts.spotify.com".to_string(),
            request_timeout_secs: 30,
            max_retry_wait_secs: 30,
        }
    }
}

impl SpotifyConfig {
    /// Creates a configuration with the given credentials and default endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PlaylistResponse {
    id: String,
    name: String,
    snapshot_id: String,
    tracks: TrackPage,
}

#[derive(Debug, Deserialize)]
struct TrackPage {
    #[serde(default)]
    items: Vec<PlaylistTrack>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistTrack {
    #[serde(default)]
    added_at: Option<String>,
    added_by: Option<UserRef>,
    track: Option<TrackObject>,
}

#[derive(Debug, Deserialize)]
struct UserRef {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TrackObject {
    id: Option<String>,
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ArtistRef>,
}

#[derive(Debug, Deserialize)]
struct ArtistRef {
    name: String,
}

impl PlaylistTrack {
    fn into_item(self) -> Item {
        let added_at = self.added_at.unwrap_or_default();
        let added_by = self.added_by.and_then(|u| u.id);
        match self.track {
            Some(track) => Item {
                id: track.id.unwrap_or_else(|| UNKNOWN_ITEM_ID.to_string()),
                name: track.name,
                artists: track.artists.into_iter().map(|a| a.name).collect(),
                added_at,
                added_by,
            },
            None => Item::unavailable(added_at, added_by),
        }
    }
}

/// Fetches playlists from the Spotify Web API.
pub struct SpotifyFetcher {
    config: SpotifyConfig,
    client: Client,
    token: RwLock<Option<AccessToken>>,
}

impl SpotifyFetcher {
    /// Creates a fetcher. Fails if credentials are missing.
    pub fn new(config: SpotifyConfig) -> MonitorResult<Self> {
        let mut missing = Vec::new();
        if config.client_id.trim().is_empty() {
            missing.push("client id");
        }
        if config.client_secret.trim().is_empty() {
            missing.push("client secret");
        }
        if !missing.is_empty() {
            return Err(MonitorError::Config(format!(
                "missing Spotify {}",
                missing.join(" and ")
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MonitorError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            token: RwLock::new(None),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SpotifyConfig {
        &self.config
    }

    /// Returns a valid access token, requesting a new one if needed.
    async fn access_token(&self) -> FetchResult<String> {
        {
            let guard = self.token.read().await;
            if let Some(token) = guard.as_ref() {
                if Instant::now() < token.expires_at {
                    return Ok(token.value.clone());
                }
            }
        } // read lock dropped here

        let mut guard = self.token.write().await;
        // Another task may have refreshed while we waited for the lock.
        if let Some(token) = guard.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        debug!("Requesting Spotify access token");
        let response = self
            .client
            .post(format!("{}/api/token", self.config.accounts_base_url))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Auth(format!(
                "token request failed ({status}): {body}"
            )));
        }

        let token: TokenResponse = read_json(response).await?;
        let lifetime = token
            .expires_in
            .unwrap_or(3600)
            .saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
        let value = token.access_token;
        *guard = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.write().await = None;
    }

    /// Performs an authorized GET, retrying on 429 and once on 401.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
        playlist: &PlaylistId,
    ) -> FetchResult<T> {
        let mut attempts = 0;
        let mut reauthorized = false;

        loop {
            attempts += 1;
            let token = self.access_token().await?;
            let response = self
                .client
                .get(url)
                .query(query)
                .bearer_auth(&token)
                .send()
                .await
                .map_err(|e| self.send_error(e))?;

            let status = response.status();
            if status.is_success() {
                return read_json(response).await;
            }

            match status {
                StatusCode::UNAUTHORIZED if !reauthorized => {
                    debug!("Access token rejected, requesting a new one");
                    reauthorized = true;
                    self.invalidate_token().await;
                }
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(FetchError::Auth(format!("{status}: {body}")));
                }
                StatusCode::NOT_FOUND => {
                    return Err(FetchError::NotFound(playlist.to_string()));
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    if attempts >= MAX_RATE_LIMIT_ATTEMPTS {
                        return Err(FetchError::RateLimited);
                    }
                    let wait = retry_after(&response)
                        .min(Duration::from_secs(self.config.max_retry_wait_secs));
                    warn!(
                        "Rate limited while fetching playlist {}, retrying in {:?}",
                        playlist, wait
                    );
                    tokio::time::sleep(wait).await;
                }
                _ => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(FetchError::Network(format!(
                        "unexpected status {status}: {body}"
                    )));
                }
            }
        }
    }

    fn send_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(Duration::from_secs(self.config.request_timeout_secs))
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl PlaylistFetcher for SpotifyFetcher {
    fn provider_name(&self) -> &'static str {
        "Spotify"
    }

    async fn fetch_playlist(&self, id: &PlaylistId, market: Option<&str>) -> FetchResult<Snapshot> {
        let url = format!(
            "{}/v1/playlists/{}",
            self.config.api_base_url,
            urlencoding::encode(id.as_str())
        );
        let mut query = Vec::new();
        if let Some(market) = market {
            query.push(("market", market));
        }

        let playlist: PlaylistResponse = self.get_json(&url, &query, id).await?;
        if playlist.id != id.as_str() {
            debug!("Playlist {} answered with id {}", id, playlist.id);
        }

        let mut items: Vec<Item> = playlist
            .tracks
            .items
            .into_iter()
            .map(PlaylistTrack::into_item)
            .collect();

        // Pages after the first carry their own query string.
        let mut next = playlist.tracks.next;
        while let Some(url) = next {
            let page: TrackPage = self.get_json(&url, &[], id).await?;
            items.extend(page.items.into_iter().map(PlaylistTrack::into_item));
            next = page.next;
        }

        debug!("Fetched playlist {} with {} tracks", id, items.len());
        Ok(Snapshot::new(id.clone(), playlist.name, playlist.snapshot_id).with_items(items))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> FetchResult<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
}

fn retry_after(response: &Response) -> Duration {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(Duration::from_secs(1), Duration::from_secs)
}
