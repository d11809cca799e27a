// handlers/mod.rs - HTTP surface of the Wakaa API
//
// Public:    /, /health, /next_api/auth/*, GET /next_api/subscription_plans
// Protected: every other /next_api/{resource} route (session token required)

use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::{self, SecurityConfig};
use crate::database::DataStore;
use crate::error::ApiError;

pub mod auth;
pub mod resources;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

/// Full application router with global middleware
pub fn router(state: AppState) -> Router {
    let cfg = config::config();

    let mut app = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth::routes())
        // Session-protected resources
        .merge(resources::routes(&state))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(handle_panic));
    app = request_logging(app, cfg.api.enable_request_logging);

    if cfg.security.enable_cors {
        app = app.layer(cors_layer(&cfg.security, &cfg.session.header_name));
    }

    app.with_state(state)
}

/// Per-request trace spans, switched by `API_ENABLE_REQUEST_LOGGING`
fn request_logging(app: Router<AppState>, enabled: bool) -> Router<AppState> {
    if enabled {
        app.layer(TraceLayer::new_for_http())
    } else {
        app
    }
}

fn cors_layer(security: &SecurityConfig, session_header: &str) -> CorsLayer {
    if security.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let mut headers = vec![header::CONTENT_TYPE, header::AUTHORIZATION];
    if let Ok(name) = HeaderName::from_bytes(session_header.as_bytes()) {
        headers.push(name);
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(headers)
        .allow_credentials(true)
}

/// Panics become the generic 500 envelope
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    tracing::error!("Handler panicked: {}", detail);
    ApiError::internal().into_response()
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route introuvable")
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Wakaa API",
            "version": version,
            "description": "Gestion des commandes WhatsApp pour micro-entrepreneurs",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "auth": "/next_api/auth/register, /next_api/auth/login, /next_api/auth/me, /next_api/auth/logout",
                "resources": "/next_api/{resource}[/:id] (session token required)",
                "plans": "GET /next_api/subscription_plans (public)",
            },
            "resources": [
                "profiles", "merchants", "customers", "products", "orders", "order_items",
                "payments", "payment_methods", "subscriptions", "subscription_plans", "api_keys",
                "user_sessions", "audit_logs", "analytics_events", "support_tickets", "notifications"
            ]
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "data_api": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "Service de données indisponible",
                    "code": "SERVICE_UNAVAILABLE",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "data_api_error": e.to_string()
                    }
                })),
            )
        }
    }
}
