use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use application::ApplicationError;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Serialize)]
struct ChallengeResponse {
    challenge_id: String,
    difficulty: u8,
    /// Unix 秒
    expires: i64,
}

#[derive(Debug, Deserialize)]
struct VerifyPayload {
    #[serde(default)]
    challenge_id: String,
    #[serde(default)]
    nonce: String,
}

#[derive(Debug, Serialize)]
struct VerifyResponse {
    valid: bool,
    token: String,
}

pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/pow/challenge", get(issue_challenge))
        .route("/pow/verify", post(verify_solution))
}

async fn issue_challenge(State(state): State<AppState>) -> Result<Json<ChallengeResponse>, ApiError> {
    let challenge = state.guards.pow.issue_challenge(state.guards.pow_difficulty)?;

    Ok(Json(ChallengeResponse {
        challenge_id: challenge.id,
        difficulty: challenge.difficulty,
        expires: challenge.expires_at.unix_timestamp(),
    }))
}

async fn verify_solution(
    State(state): State<AppState>,
    payload: Result<Json<VerifyPayload>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(payload) = payload?;
    // 空 nonce 也交给校验
    if payload.challenge_id.is_empty() {
        return Err(ApiError::bad_request("challenge_id is required"));
    }

    if let Err(reason) = state
        .guards
        .pow
        .verify_and_consume(&payload.challenge_id, &payload.nonce)
    {
        tracing::debug!(%reason, challenge_id = %payload.challenge_id, "PoW 校验失败");
        return Err(ApplicationError::expired_or_invalid("Invalid or expired challenge").into());
    }

    let token = state.guards.pow.issue_proof_token()?;
    Ok(Json(VerifyResponse { valid: true, token }))
}
