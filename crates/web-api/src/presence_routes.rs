use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use application::require_membership;
use domain::{PresenceEntry, RoomId, UserId};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
struct HeartbeatPayload {
    #[serde(default)]
    room_id: String,
}

#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
}

#[derive(Debug, Serialize)]
struct LeaveResponse {
    ok: bool,
    removed: bool,
}

#[derive(Debug, Serialize)]
struct RoomPresenceResponse {
    online: Vec<PresenceEntry>,
    count: usize,
}

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/presence/heartbeat", post(heartbeat))
        .route("/presence/leave", post(leave))
        .route("/presence/{room_id}", get(room_presence))
}

fn parse_room_id(raw: &str) -> Result<RoomId, ApiError> {
    if raw.is_empty() {
        return Err(ApiError::bad_request("room_id is required"));
    }
    Ok(raw.parse::<RoomId>()?)
}

async fn ensure_member(state: &AppState, room_id: RoomId, user_id: UserId) -> Result<(), ApiError> {
    let room = state.directory.find_room(room_id).await?;
    require_membership(state.directory.as_ref(), room, user_id).await?;
    Ok(())
}

async fn heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<HeartbeatPayload>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let Json(payload) = payload?;
    let room_id = parse_room_id(&payload.room_id)?;
    ensure_member(&state, room_id, user_id).await?;

    // 没有资料时用用户 ID 占位
    let display_name = state
        .directory
        .find_user(user_id)
        .await?
        .map(|profile| profile.presence_name().to_string())
        .unwrap_or_else(|| user_id.to_string());

    state.guards.presence.heartbeat(user_id, room_id, display_name);
    Ok(Json(OkResponse { ok: true }))
}

async fn leave(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<LeaveResponse>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let removed = state.guards.presence.remove(user_id);
    Ok(Json(LeaveResponse { ok: true, removed }))
}

async fn room_presence(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(room_id): Path<String>,
) -> Result<Json<RoomPresenceResponse>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let room_id = parse_room_id(&room_id)?;
    ensure_member(&state, room_id, user_id).await?;

    let online = state.guards.presence.room_presence(room_id);
    let count = online.len();
    Ok(Json(RoomPresenceResponse { online, count }))
}
