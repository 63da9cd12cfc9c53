//! `/api/v1/auth`: the caller's own record and token refresh.
//!
//! Credentials are issued elsewhere; these routes only read and re-sign.

use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::{verify_token, Claims, CurrentIdentity, TokenType};
use crate::state::AppState;
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Routes reached through the auth gate, mounted under `/auth`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::new().route("/profile", get(profile))
}

/// Routes that carry their own credential in the body.
pub fn public_routes() -> Router<AppState> {
    Router::new().route("/auth/refresh-token", post(refresh_token))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: String,
}

async fn profile(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> ApiResult<Json<Value>> {
    let user = state
        .directory
        .get(&identity.id)
        .ok_or_else(|| ApiError::NotFound("User".into()))?;
    Ok(Json(json!({ "user": user })))
}

/// Trade a refresh token for a fresh access and refresh pair.
///
/// The subject must still exist and be active; role is never carried over
/// from the old token.
async fn refresh_token(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> ApiResult<Json<Value>> {
    if request.refresh_token.is_empty() {
        return Err(ApiError::NoCredential);
    }
    let identity = verify_token(
        &request.refresh_token,
        TokenType::Refresh,
        &state.decoder,
        &*state.directory,
    )
    .await?;

    let lifetimes = state.token_lifetimes;
    let token = state
        .decoder
        .encode(&Claims::new_access(identity.id, lifetimes.access_secs))
        .map_err(|e| ApiError::Internal(e.into()))?;
    let refresh = state
        .decoder
        .encode(&Claims::new_refresh(identity.id, lifetimes.refresh_secs))
        .map_err(|e| ApiError::Internal(e.into()))?;

    info!(user_id = %identity.id, "Token refreshed");
    Ok(Json(json!({ "token": token, "refreshToken": refresh })))
}
