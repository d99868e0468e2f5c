use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use application::{
    invite::parse_invite_timestamp, require_membership, ApplicationError, InviteLink,
};
use domain::RoomId;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
struct GeneratePayload {
    #[serde(default)]
    room_slug: String,
    expires_in: Option<i64>,
}

/// 邀请链接中的三个参数：房间 slug、过期时间戳、签名
#[derive(Debug, Deserialize)]
struct ValidatePayload {
    #[serde(default)]
    r: String,
    #[serde(default)]
    t: String,
    #[serde(default)]
    s: String,
}

#[derive(Debug, Serialize)]
struct ValidateResponse {
    valid: bool,
    room_id: RoomId,
    room_slug: String,
    room_name: String,
}

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/invite/generate", post(generate_invite))
        .route("/invite/validate", post(validate_invite))
}

async fn generate_invite(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GeneratePayload>, JsonRejection>,
) -> Result<Json<InviteLink>, ApiError> {
    let user_id = state.jwt_service.extract_user_from_headers(&headers)?;
    let Json(payload) = payload?;
    if payload.room_slug.is_empty() {
        return Err(ApiError::bad_request("room_slug is required"));
    }

    let room = state.directory.find_room_by_slug(&payload.room_slug).await?;
    let room = require_membership(state.directory.as_ref(), room, user_id).await?;

    let link = state
        .guards
        .invites
        .generate_url(&room.slug, payload.expires_in)?;
    tracing::info!(user_id = %user_id, room_slug = %room.slug, expires_at = %link.expires_at, "生成邀请链接");
    Ok(Json(link))
}

async fn validate_invite(
    State(state): State<AppState>,
    payload: Result<Json<ValidatePayload>, JsonRejection>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let Json(payload) = payload?;
    if payload.r.is_empty() || payload.t.is_empty() || payload.s.is_empty() {
        return Err(ApiError::bad_request("r, t and s are required"));
    }

    let expires_at = parse_invite_timestamp(&payload.t)?;
    if !state.guards.invites.validate(&payload.r, expires_at, &payload.s)? {
        tracing::debug!(room_slug = %payload.r, expires_at, "邀请签名无效或已过期");
        return Err(ApplicationError::expired_or_invalid("Invalid or expired invite").into());
    }

    let room = state
        .directory
        .find_room_by_slug(&payload.r)
        .await?
        .ok_or_else(|| ApiError::not_found("Room not found"))?;

    Ok(Json(ValidateResponse {
        valid: true,
        room_id: room.id,
        room_slug: room.slug,
        room_name: room.name,
    }))
}
