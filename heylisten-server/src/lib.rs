//! HTTP API and configuration for the Heylisten service.
//!
//! The router holds an explicit handle to the [`MonitorController`]; every
//! mutating call goes through the controller and therefore serializes with
//! scheduled cycles.

pub mod config;
mod error;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{delete, get, post, put};
use axum::Router;
use heylisten_monitor::{CycleSummary, DiscordDeliverer, MonitorController};
use heylisten_storage::UpsertOutcome;
use heylisten_types::{PlaylistId, PlaylistInfo, RecipientId, RegistryEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use config::Config;
pub use error::ApiError;

/// Playlists each recipient may choose from, as last reported by the web
/// session that listed them. Never persisted.
#[derive(Debug, Default)]
pub struct AvailablePlaylists {
    by_recipient: RwLock<HashMap<RecipientId, Vec<PlaylistInfo>>>,
}

impl AvailablePlaylists {
    pub async fn set(&self, recipient: RecipientId, playlists: Vec<PlaylistInfo>) {
        self.by_recipient.write().await.insert(recipient, playlists);
    }

    pub async fn get(&self, recipient: &RecipientId) -> Vec<PlaylistInfo> {
        self.by_recipient
            .read()
            .await
            .get(recipient)
            .cloned()
            .unwrap_or_default()
    }
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<MonitorController>,
    pub discord: Option<Arc<DiscordDeliverer>>,
    pub available: Arc<AvailablePlaylists>,
}

impl AppState {
    pub fn new(controller: Arc<MonitorController>) -> Self {
        Self {
            controller,
            discord: None,
            available: Arc::new(AvailablePlaylists::default()),
        }
    }

    #[must_use]
    pub fn with_discord(mut self, discord: Arc<DiscordDeliverer>) -> Self {
        self.discord = Some(discord);
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    pub monitor_active: bool,
    pub cycle_running: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct RecipientQuery {
    pub recipient: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AddPlaylistRequest {
    pub playlist_id: String,
    #[serde(default)]
    pub recipient: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AddPlaylistResponse {
    pub playlist: RegistryEntry,
    pub outcome: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ReplacePlaylistsRequest {
    pub playlist_ids: Vec<String>,
    #[serde(default)]
    pub candidates: Option<Vec<PlaylistInfo>>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct WebhookRequest {
    pub url: String,
}

fn parse_recipient(raw: Option<&str>) -> Result<Option<RecipientId>, ApiError> {
    raw.map(RecipientId::parse).transpose().map_err(ApiError::from)
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        monitor_active: true,
        cycle_running: state.controller.is_cycle_running(),
    })
}

async fn list_playlists_handler(
    State(state): State<AppState>,
    Query(query): Query<RecipientQuery>,
) -> Result<Json<Vec<RegistryEntry>>, ApiError> {
    let recipient = parse_recipient(query.recipient.as_deref())?;
    Ok(Json(state.controller.playlists(recipient.as_ref()).await))
}

async fn add_playlist_handler(
    State(state): State<AppState>,
    Json(request): Json<AddPlaylistRequest>,
) -> Result<Response, ApiError> {
    let id = PlaylistId::parse(&request.playlist_id)?;
    let recipient = parse_recipient(request.recipient.as_deref())?;

    let added = state.controller.add_playlist(&id, recipient).await?;
    let (status, outcome) = match added.outcome {
        UpsertOutcome::Inserted => (StatusCode::CREATED, "inserted"),
        UpsertOutcome::AttachedRecipient => (StatusCode::CREATED, "attached_recipient"),
        UpsertOutcome::AlreadyPresent => (StatusCode::OK, "already_present"),
    };
    let body = AddPlaylistResponse {
        playlist: RegistryEntry::new(added.info, added.recipient),
        outcome: outcome.to_string(),
    };
    Ok((status, Json(body)).into_response())
}

async fn remove_playlist_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RecipientQuery>,
) -> Result<StatusCode, ApiError> {
    let id = PlaylistId::parse(&id)?;
    let recipient = parse_recipient(query.recipient.as_deref())?;
    state
        .controller
        .remove_playlist(&id, recipient.as_ref())
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_playlist_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CycleSummary>, ApiError> {
    let id = PlaylistId::parse(&id)?;
    let report = state.controller.check_playlist(&id).await?;
    Ok(Json(report.summary()))
}

async fn replace_playlists_handler(
    State(state): State<AppState>,
    Path(recipient): Path<String>,
    Json(request): Json<ReplacePlaylistsRequest>,
) -> Result<Json<Vec<RegistryEntry>>, ApiError> {
    let recipient = RecipientId::parse(&recipient)?;
    let ids = request
        .playlist_ids
        .iter()
        .map(|id| PlaylistId::parse(id))
        .collect::<Result<Vec<_>, _>>()?;
    let candidates = match request.candidates {
        Some(candidates) => candidates,
        None => state.available.get(&recipient).await,
    };

    let entries = state
        .controller
        .replace_playlists(&recipient, &ids, &candidates)
        .await?;
    Ok(Json(entries))
}

async fn set_available_handler(
    State(state): State<AppState>,
    Path(recipient): Path<String>,
    Json(playlists): Json<Vec<PlaylistInfo>>,
) -> Result<StatusCode, ApiError> {
    let recipient = RecipientId::parse(&recipient)?;
    state.available.set(recipient, playlists).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn run_cycle_handler(State(state): State<AppState>) -> Json<CycleSummary> {
    Json(state.controller.run_cycle().await.summary())
}

async fn register_webhook_handler(
    State(state): State<AppState>,
    Path(recipient): Path<String>,
    Json(request): Json<WebhookRequest>,
) -> Result<StatusCode, ApiError> {
    let Some(discord) = state.discord.as_ref() else {
        return Err(ApiError::NotFound(
            "Discord notifications are not configured".to_string(),
        ));
    };
    let recipient = RecipientId::parse(&recipient)?;
    discord.register_webhook(recipient, &request.url).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/v1/playlists",
            get(list_playlists_handler).post(add_playlist_handler),
        )
        .route("/api/v1/playlists/{id}", delete(remove_playlist_handler))
        .route("/api/v1/playlists/{id}/check", post(check_playlist_handler))
        .route("/api/v1/check", post(run_cycle_handler))
        .route(
            "/api/v1/recipients/{recipient}/playlists",
            put(replace_playlists_handler),
        )
        .route(
            "/api/v1/recipients/{recipient}/available",
            put(set_available_handler),
        )
        .route(
            "/api/v1/recipients/{recipient}/webhook",
            post(register_webhook_handler),
        )
        .with_state(state)
}
