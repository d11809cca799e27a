// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// HTTP API error with appropriate status codes and client-facing (French) messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<BTreeMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized, with a machine-readable reason (NO_TOKEN, SESSION_EXPIRED, ...)
    Unauthorized { message: String, code: &'static str },

    // 403 Forbidden
    Forbidden { message: String, code: &'static str },

    // 404 Not Found
    NotFound { message: String, code: &'static str },

    // 405 Method Not Allowed
    MethodNotAllowed(String),

    // 409 Conflict
    Conflict(String),

    // 500 Internal Server Error
    InternalServerError(String),

    // 501 Not Implemented
    NotImplemented(String),

    // 502 Bad Gateway (data API answered with an error)
    BadGateway(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidJson(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized { message, .. } => message,
            ApiError::Forbidden { message, .. } => message,
            ApiError::NotFound { message, .. } => message,
            ApiError::MethodNotAllowed(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
            ApiError::NotImplemented(msg) => msg,
            ApiError::BadGateway(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized { code, .. } => code,
            ApiError::Forbidden { code, .. } => code,
            ApiError::NotFound { code, .. } => code,
            ApiError::MethodNotAllowed(_) => "METHOD_NOT_ALLOWED",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::NotImplemented(_) => "NOT_IMPLEMENTED",
            ApiError::BadGateway(_) => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Convert to the `{ success: false, error, code }` envelope
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "error": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError { field_errors: Some(field_errors), .. } = self {
            response["field_errors"] = json!(field_errors);
        }

        response
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<BTreeMap<String, String>>) -> Self {
        ApiError::ValidationError { message: message.into(), field_errors }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized { message: message.into(), code: "UNAUTHORIZED" }
    }

    pub fn unauthorized_with(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Unauthorized { message: message.into(), code }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden { message: message.into(), code: "FORBIDDEN" }
    }

    pub fn forbidden_with(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::Forbidden { message: message.into(), code }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound { message: message.into(), code: "NOT_FOUND" }
    }

    pub fn not_found_with(code: &'static str, message: impl Into<String>) -> Self {
        ApiError::NotFound { message: message.into(), code }
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        ApiError::MethodNotAllowed(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        ApiError::NotImplemented(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        ApiError::BadGateway(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }

    /// Generic 500 used for anything unexpected
    pub fn internal() -> Self {
        ApiError::internal_server_error("Erreur interne du serveur")
    }
}

// Convert other error types to ApiError
impl From<crate::database::RecordError> for ApiError {
    fn from(err: crate::database::RecordError) -> Self {
        match err {
            crate::database::RecordError::InvalidJson(_) => {
                ApiError::invalid_json("Le corps de la requête doit être un objet JSON")
            }
        }
    }
}

impl From<crate::database::DataError> for ApiError {
    fn from(err: crate::database::DataError) -> Self {
        use crate::database::DataError;
        match err {
            DataError::NotFound(_) => ApiError::not_found("Ressource introuvable"),
            DataError::Conflict(msg) => {
                tracing::warn!("Data API conflict: {}", msg);
                ApiError::conflict("Cette ressource existe déjà")
            }
            DataError::Query(e) => ApiError::bad_request(format!("Paramètre de requête invalide: {}", e)),
            DataError::Connection(msg) => {
                tracing::error!("Data API unreachable: {}", msg);
                ApiError::service_unavailable("Service de données temporairement indisponible")
            }
            DataError::Api { status, message, .. } => {
                // Don't expose internal data API errors to clients
                tracing::error!("Data API error {}: {}", status, message);
                ApiError::bad_gateway("Erreur du service de données")
            }
            DataError::InvalidUrl(msg) | DataError::Decode(msg) => {
                tracing::error!("Data API failure: {}", msg);
                ApiError::internal()
            }
        }
    }
}

impl From<crate::filter::FilterError> for ApiError {
    fn from(err: crate::filter::FilterError) -> Self {
        ApiError::bad_request(format!("Paramètre de requête invalide: {}", err))
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        if self.status_code().is_server_error() {
            tracing::error!("{} {}", self.status_code(), self.message());
        }
        (self.status_code(), Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::DataError;

    #[test]
    fn envelope_carries_code_and_field_errors() {
        let mut fields = BTreeMap::new();
        fields.insert("phone".to_string(), "Numéro de téléphone invalide".to_string());
        let err = ApiError::validation_error("Données invalides", Some(fields));

        let body = err.to_json();
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field_errors"]["phone"], "Numéro de téléphone invalide");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn data_errors_map_to_statuses() {
        let cases = [
            (DataError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (DataError::Conflict("dup".into()), StatusCode::CONFLICT),
            (DataError::Connection("refused".into()), StatusCode::SERVICE_UNAVAILABLE),
            (
                DataError::Api { status: 500, code: None, message: "boom".into() },
                StatusCode::BAD_GATEWAY,
            ),
            (DataError::Decode("bad".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn unauthorized_keeps_reason_code() {
        let err = ApiError::unauthorized_with("SESSION_EXPIRED", "Session expirée");
        assert_eq!(err.error_code(), "SESSION_EXPIRED");
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}
