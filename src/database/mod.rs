pub mod crud;
pub mod memory;
pub mod models;
pub mod postgrest;
pub mod record;
pub mod store;

use std::sync::Arc;

use crate::config::AppConfig;

pub use crud::CrudOperations;
pub use memory::MemoryStore;
pub use postgrest::PostgrestClient;
pub use record::{Record, RecordError};
pub use store::{DataError, DataStore};

/// Build the configured data store: the in-process store for `DATA_API_URL=memory`,
/// otherwise a PostgREST client.
pub fn connect(config: &AppConfig) -> Result<Arc<dyn DataStore>, DataError> {
    if config.uses_memory_store() {
        tracing::warn!("DATA_API_URL=memory: records are kept in process memory and lost on restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    tracing::info!("Using data API at {}", config.data_api.url);
    Ok(Arc::new(PostgrestClient::from_config(&config.data_api)?))
}
