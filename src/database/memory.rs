use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::database::record::{record_id, Record};
use crate::database::store::{DataError, DataStore};
use crate::filter::filter_where::validate_table_name;
use crate::filter::FilterData;

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: Vec<Record>,
}

/// In-process `DataStore` with PostgREST filter semantics.
///
/// Used in development mode (`DATA_API_URL=memory`) and by the tests. Ids are
/// auto-incremented per table; no constraints are enforced.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in `table`, including soft-deleted ones
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map(|t| t.rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn select(&self, table: &str, filter: &FilterData) -> Result<Vec<Record>, DataError> {
        validate_table_name(table)?;
        filter.validate()?;
        let tables = self.tables.read().await;
        let rows = tables.get(table).map(|t| t.rows.clone()).unwrap_or_default();
        Ok(filter.apply(rows))
    }

    async fn insert(&self, table: &str, mut record: Record) -> Result<Record, DataError> {
        validate_table_name(table)?;
        let mut tables = self.tables.write().await;
        let t = tables.entry(table.to_string()).or_default();

        match record_id(&record) {
            Some(id) => t.next_id = t.next_id.max(id),
            None => {
                t.next_id += 1;
                record.insert("id".to_string(), Value::from(t.next_id));
            }
        }

        t.rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, table: &str, filter: &FilterData, patch: Record) -> Result<Vec<Record>, DataError> {
        validate_table_name(table)?;
        filter.validate()?;
        let selector = filter.selector();
        let mut tables = self.tables.write().await;
        let Some(t) = tables.get_mut(table) else {
            return Ok(vec![]);
        };

        let mut updated = Vec::new();
        for row in t.rows.iter_mut().filter(|r| selector.matches(r)) {
            for (k, v) in &patch {
                row.insert(k.clone(), v.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filter: &FilterData) -> Result<Vec<Record>, DataError> {
        validate_table_name(table)?;
        filter.validate()?;
        let selector = filter.selector();
        let mut tables = self.tables.write().await;
        let Some(t) = tables.get_mut(table) else {
            return Ok(vec![]);
        };

        let (removed, kept): (Vec<Record>, Vec<Record>) = t.rows.drain(..).partition(|r| selector.matches(r));
        t.rows = kept;
        Ok(removed)
    }

    async fn ping(&self) -> Result<(), DataError> {
        Ok(())
    }
}
