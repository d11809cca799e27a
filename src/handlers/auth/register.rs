// handlers/auth/register.rs - POST /next_api/auth/register

use axum::{extract::State, http::HeaderMap};
use serde_json::Value;

use crate::auth::{token::session_cookie, AuthPayload, AuthService, RegisterInput};
use crate::database::models::{Role, StringEnum};
use crate::database::record::from_json;
use crate::error::ApiError;
use crate::handlers::AppState;
use crate::middleware::{client_info, ApiResponse, ApiResult, JsonBody};
use crate::validation::Validator;

/// Create a profile (plus merchant and trial subscription for merchants) and open a session.
///
/// Input: `{ email, password, full_name, phone?, role?, business_name?, ... }`; `role` is merchant or customer
///
/// Output (201): `{ user, merchant?, token, expires_at }`, with the session cookie set
pub async fn register_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<AuthPayload> {
    let data = from_json(body)?;
    let mut v = Validator::new(&data);
    v.required("email")
        .email("email")
        .required("password")
        .min_len("password", 8)
        .required("full_name")
        .phone("phone")
        .phone("whatsapp_number")
        .one_of::<Role>("role");
    if data.get("role").and_then(Value::as_str).and_then(Role::parse) == Some(Role::Admin) {
        v.add("role", "Inscription possible uniquement en tant que merchant ou customer");
    }
    v.finish()?;

    let input: RegisterInput = serde_json::from_value(Value::Object(data))
        .map_err(|e| ApiError::bad_request(format!("Données d'inscription invalides: {}", e)))?;

    let payload = AuthService::new(state.store.clone())
        .register(input, &client_info(&headers))
        .await?;

    let cookie = session_cookie(&payload.token);
    Ok(ApiResponse::created(payload).with_cookie(cookie))
}
