// handlers/auth/logout.rs - POST /next_api/auth/logout

use axum::{extract::State, http::HeaderMap};
use serde_json::{json, Value};

use crate::auth::{extract_token, token::clear_session_cookie, AuthService};
use crate::config;
use crate::handlers::AppState;
use crate::middleware::{ApiResponse, ApiResult};

/// Deactivate the session and clear the cookie. Always answers 200.
pub async fn logout_post(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Value> {
    let token = extract_token(&headers, &config::config().session);
    AuthService::new(state.store.clone()).logout(token.as_deref()).await;
    Ok(ApiResponse::success(json!({ "message": "Déconnexion réussie" })).with_cookie(clear_session_cookie()))
}
