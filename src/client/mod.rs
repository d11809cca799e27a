//! HTTP client for the Wakaa API with a TTL response cache.

pub mod api;
pub mod cache;
pub mod error;

pub use api::ApiClient;
pub use cache::ResponseCache;
pub use error::ClientError;
