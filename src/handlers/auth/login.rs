// handlers/auth/login.rs - POST /next_api/auth/login

use axum::{extract::State, http::HeaderMap};
use serde::Deserialize;

use crate::auth::{token::session_cookie, AuthPayload, AuthService};
use crate::error::ApiError;
use crate::handlers::AppState;
use crate::middleware::{client_info, ApiResponse, ApiResult, JsonBody};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Exchange email and password for a session token.
///
/// 400 when a field is missing, 401 on bad credentials (same message for an
/// unknown email and a wrong password), 403 when the account is disabled.
pub async fn login_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<LoginRequest>,
) -> ApiResult<AuthPayload> {
    let email = body.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    let password = body.password.as_deref().filter(|p| !p.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::bad_request("Email et mot de passe requis"));
    };

    let payload = AuthService::new(state.store.clone())
        .login(email, password, &client_info(&headers))
        .await?;

    let cookie = session_cookie(&payload.token);
    Ok(ApiResponse::success(payload).with_cookie(cookie))
}
