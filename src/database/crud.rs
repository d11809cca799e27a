use std::sync::Arc;

use serde_json::Value;

use crate::config;
use crate::database::record::{now_timestamp, strip_system_fields, Record};
use crate::database::store::{DataError, DataStore};
use crate::filter::FilterData;

const DEFAULT_ORDER: &str = "created_at desc";

/// Generic CRUD helper bound to one table of the data API
#[derive(Clone)]
pub struct CrudOperations {
    table: String,
    store: Arc<dyn DataStore>,
}

impl CrudOperations {
    pub fn new(table: impl Into<String>, store: Arc<dyn DataStore>) -> Self {
        Self { table: table.into(), store }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Paged listing. Defaults to newest first; the limit is capped by `API_MAX_LIMIT`.
    pub async fn find_many(
        &self,
        filters: FilterData,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Record>, DataError> {
        let api = &config::config().api;
        let applied_limit = limit.unwrap_or(api.default_limit).clamp(0, api.max_limit);

        let mut filters = if filters.has_order() { filters } else { filters.order(DEFAULT_ORDER)? };
        filters.limit = Some(applied_limit);
        filters.offset = offset.filter(|o| *o > 0);

        self.store.select(&self.table, &filters).await
    }

    /// Every matching row, without the listing defaults
    pub async fn find_where(&self, filters: FilterData) -> Result<Vec<Record>, DataError> {
        self.store.select(&self.table, &filters).await
    }

    pub async fn find_one(&self, filters: FilterData) -> Result<Option<Record>, DataError> {
        let rows = self.store.select(&self.table, &filters.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Record>, DataError> {
        self.find_one(FilterData::by_id(id)).await
    }

    pub async fn create(&self, mut data: Record) -> Result<Record, DataError> {
        strip_system_fields(&mut data);
        let now = now_timestamp();
        data.insert("created_at".to_string(), Value::String(now.clone()));
        data.insert("modified_at".to_string(), Value::String(now));
        self.store.insert(&self.table, data).await
    }

    pub async fn update(&self, id: i64, mut data: Record) -> Result<Record, DataError> {
        strip_system_fields(&mut data);
        data.insert("modified_at".to_string(), Value::String(now_timestamp()));

        self.store
            .update(&self.table, &FilterData::by_id(id), data)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(id))
    }

    /// Patch every row matching `filters`; returns the rows touched
    pub async fn update_where(&self, filters: FilterData, mut data: Record) -> Result<Vec<Record>, DataError> {
        strip_system_fields(&mut data);
        data.insert("modified_at".to_string(), Value::String(now_timestamp()));
        self.store.update(&self.table, &filters, data).await
    }

    /// Hard delete
    pub async fn delete(&self, id: i64) -> Result<Record, DataError> {
        self.store
            .delete(&self.table, &FilterData::by_id(id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| self.not_found(id))
    }

    /// Mark a row inactive or closed instead of removing it
    pub async fn soft_delete(&self, id: i64, patch: Record) -> Result<Record, DataError> {
        self.update(id, patch).await
    }

    fn not_found(&self, id: i64) -> DataError {
        DataError::NotFound(format!("{} #{}", self.table, id))
    }
}
