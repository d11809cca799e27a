use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message} ({status})")]
    Api {
        status: u16,
        message: String,
        code: Option<String>,
    },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("Not logged in")]
    NotAuthenticated,
}

impl ClientError {
    /// Status code for API errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
