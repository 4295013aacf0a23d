//! Player status and CRUD endpoints
//!
//! Reads come from the published snapshot; writes go straight to the players
//! file and show up in the status after the checker's next reload.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, Redirect},
    Json,
};
use serde_json::{json, Value};

use crate::api::response::ApiResponse;
use crate::api::AppState;
use crate::error::{AppError, AppResult, StoreError};
use crate::models::{CreatePlayerRequest, Endpoint, IpPort, StatusReport, UpdatePlayerRequest};

const PLAYERS_PAGE: &str = include_str!("../../static/players.html");

/// A path key that does not parse cannot name an existing player
fn player_key(raw: &str) -> AppResult<IpPort> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("player {} not found", raw)))
}

pub async fn index() -> Redirect {
    Redirect::to("/players")
}

pub async fn page() -> Html<&'static str> {
    Html(PLAYERS_PAGE)
}

/// Latest check results
#[utoipa::path(
    get,
    path = "/api/players",
    tag = "players",
    responses(
        (status = 200, description = "Status of every configured player", body = StatusReport),
    )
)]
pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.snapshots.report().await)
}

/// Players as currently persisted, before the checker picks them up
#[utoipa::path(
    get,
    path = "/api/players/config",
    tag = "players",
    responses(
        (status = 200, description = "Configured players", body = [Endpoint]),
        (status = 500, description = "Players file unreadable", body = super::response::ApiError),
    )
)]
pub async fn list_config(State(state): State<AppState>) -> AppResult<ApiResponse<Vec<Endpoint>>> {
    let store = state.store.clone();
    let players = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(StoreError::from)??;
    Ok(ApiResponse::success(players))
}

/// Add a player
#[utoipa::path(
    post,
    path = "/api/players",
    tag = "players",
    request_body = CreatePlayerRequest,
    responses(
        (status = 201, description = "Player added"),
        (status = 400, description = "Malformed ip_port", body = super::response::ApiError),
        (status = 409, description = "ip_port already present", body = super::response::ApiError),
    )
)]
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreatePlayerRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let endpoint = Endpoint::new(req.name.as_deref(), &req.ip_port)?;
    let player = state.store.add(endpoint).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "ok", "player": player })),
    ))
}

/// Edit a player's name and/or address
#[utoipa::path(
    put,
    path = "/api/players/{ip_port}",
    tag = "players",
    params(("ip_port" = String, Path, description = "Current host:port of the player")),
    request_body = UpdatePlayerRequest,
    responses(
        (status = 200, description = "Player updated"),
        (status = 400, description = "Malformed new ip_port", body = super::response::ApiError),
        (status = 404, description = "Unknown player", body = super::response::ApiError),
        (status = 409, description = "New ip_port already present", body = super::response::ApiError),
    )
)]
pub async fn update(
    State(state): State<AppState>,
    Path(ip_port): Path<String>,
    Json(req): Json<UpdatePlayerRequest>,
) -> AppResult<Json<Value>> {
    let key = player_key(&ip_port)?;
    let player = state.store.update(&key, req).await?;
    Ok(Json(json!({ "status": "updated", "player": player })))
}

/// Remove a player
#[utoipa::path(
    delete,
    path = "/api/players/{ip_port}",
    tag = "players",
    params(("ip_port" = String, Path, description = "host:port of the player")),
    responses(
        (status = 200, description = "Player removed"),
        (status = 404, description = "Unknown player", body = super::response::ApiError),
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    Path(ip_port): Path<String>,
) -> AppResult<Json<Value>> {
    let key = player_key(&ip_port)?;
    let player = state.store.remove(&key).await?;
    Ok(Json(json!({ "status": "deleted", "player": player })))
}
