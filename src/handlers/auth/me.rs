// handlers/auth/me.rs - GET /next_api/auth/me

use axum::{extract::State, http::HeaderMap};

use crate::auth::{extract_token, AuthService, MePayload};
use crate::config;
use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult};

/// Current user, merchant and session expiry for the presented token
pub async fn me_get(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<MePayload> {
    let token = extract_token(&headers, &config::config().session);
    let payload = AuthService::new(state.store.clone()).me(token.as_deref()).await?;
    Ok(ApiResponse::success(payload))
}
