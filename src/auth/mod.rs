pub mod password;
pub mod service;
pub mod token;

use thiserror::Error;

use crate::database::DataError;
use crate::error::ApiError;

pub use password::{hash_password, verify_password};
pub use service::{AuthPayload, AuthService, ClientInfo, MePayload, RegisterInput};
pub use token::{extract_token, generate_api_key, generate_session_token, hash_api_key};

/// Failures of the session-token flow; each maps to a fixed status and code
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentification requise")]
    NoToken,

    #[error("Session invalide")]
    InvalidSession,

    #[error("Session désactivée")]
    SessionInactive,

    #[error("Session expirée, veuillez vous reconnecter")]
    SessionExpired,

    #[error("Utilisateur introuvable")]
    UserNotFound,

    #[error("Ce compte a été désactivé")]
    AccountDisabled,

    #[error("Email ou mot de passe incorrect")]
    InvalidCredentials,

    #[error("Un compte avec cet email existe déjà")]
    EmailTaken,

    #[error("Ce numéro de téléphone est déjà utilisé")]
    PhoneTaken,

    #[error("Données de profil illisibles: {0}")]
    MalformedRow(String),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::NoToken => ApiError::unauthorized_with("NO_TOKEN", message),
            AuthError::InvalidSession => ApiError::unauthorized_with("INVALID_SESSION", message),
            AuthError::SessionInactive => ApiError::unauthorized_with("SESSION_INACTIVE", message),
            AuthError::SessionExpired => ApiError::unauthorized_with("SESSION_EXPIRED", message),
            AuthError::InvalidCredentials => ApiError::unauthorized_with("INVALID_CREDENTIALS", message),
            AuthError::UserNotFound => ApiError::not_found_with("USER_NOT_FOUND", message),
            AuthError::AccountDisabled => ApiError::forbidden_with("ACCOUNT_DISABLED", message),
            AuthError::EmailTaken | AuthError::PhoneTaken => ApiError::conflict(message),
            AuthError::MalformedRow(detail) => {
                tracing::error!("Unreadable auth row: {}", detail);
                ApiError::internal()
            }
            AuthError::Data(e) => e.into(),
        }
    }
}
