use async_trait::async_trait;
use thiserror::Error;

use crate::database::record::Record;
use crate::filter::{FilterData, FilterError};

/// Errors from the data API layer
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Invalid data API URL: {0}")]
    InvalidUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid query: {0}")]
    Query(#[from] FilterError),

    #[error("Data API error ({status}): {message}")]
    Api { status: u16, code: Option<String>, message: String },

    #[error("Data API unreachable: {0}")]
    Connection(String),

    #[error("Unexpected data API response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            DataError::Connection(err.to_string())
        } else {
            DataError::Decode(err.to_string())
        }
    }
}

/// Table-oriented access to a PostgREST-style backend.
///
/// Every call is independent; there are no transactions across calls.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Rows matching `filter`, honoring its order and page window
    async fn select(&self, table: &str, filter: &FilterData) -> Result<Vec<Record>, DataError>;

    /// Insert one row and return it as stored (with id)
    async fn insert(&self, table: &str, record: Record) -> Result<Record, DataError>;

    /// Patch every row matching `filter`, returning the updated rows
    async fn update(&self, table: &str, filter: &FilterData, patch: Record) -> Result<Vec<Record>, DataError>;

    /// Remove every row matching `filter`, returning the removed rows
    async fn delete(&self, table: &str, filter: &FilterData) -> Result<Vec<Record>, DataError>;

    /// Connectivity check used by /health
    async fn ping(&self) -> Result<(), DataError>;
}
