use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{extract_token, AuthError, AuthService, ClientInfo};
use crate::config;
use crate::database::models::Role;
use crate::database::record::record_id;
use crate::error::ApiError;
use crate::handlers::AppState;

/// Caller identity injected by [`require_session`]
#[derive(Clone, Debug)]
pub struct AuthSession {
    pub session_id: i64,
    pub user_id: i64,
    pub role: Role,
    pub merchant_id: Option<i64>,
}

impl AuthSession {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Session-token middleware: validates the token like `/auth/me` does and
/// injects an [`AuthSession`] into the request extensions
pub async fn require_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&headers, &config::config().session).ok_or(AuthError::NoToken)?;

    let auth = AuthService::new(state.store.clone());
    let (session, profile) = auth.validate_session(&token).await?;
    let merchant_id = auth.merchant_for(&profile).await?.as_ref().and_then(record_id);

    request.extensions_mut().insert(AuthSession {
        session_id: session.id,
        user_id: profile.id,
        role: profile.role,
        merchant_id,
    });

    Ok(next.run(request).await)
}

/// Client address and user agent for the session row
pub fn client_info(headers: &HeaderMap) -> ClientInfo {
    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .or_else(|| headers.get("x-real-ip").and_then(|v| v.to_str().ok()))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    ClientInfo { ip_address, user_agent }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.1, 172.16.0.1"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("wakaactl"));
        let info = client_info(&headers);
        assert_eq!(info.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(info.user_agent.as_deref(), Some("wakaactl"));
    }
}
