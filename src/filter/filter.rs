use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOp, FilterWhereInfo};

impl FilterData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_id(id: i64) -> Self {
        Self::new().eq("id", id)
    }

    pub fn condition(mut self, column: impl Into<String>, operator: FilterOp, data: impl Into<Value>) -> Self {
        self.conditions.push(FilterWhereInfo { column: column.into(), operator, data: data.into() });
        self
    }

    pub fn eq(self, column: impl Into<String>, data: impl Into<Value>) -> Self {
        self.condition(column, FilterOp::Eq, data)
    }

    pub fn neq(self, column: impl Into<String>, data: impl Into<Value>) -> Self {
        self.condition(column, FilterOp::Neq, data)
    }

    pub fn gte(self, column: impl Into<String>, data: impl Into<Value>) -> Self {
        self.condition(column, FilterOp::Gte, data)
    }

    pub fn lte(self, column: impl Into<String>, data: impl Into<Value>) -> Self {
        self.condition(column, FilterOp::Lte, data)
    }

    pub fn ilike(self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.condition(column, FilterOp::ILike, Value::String(pattern.into()))
    }

    pub fn is_in(self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.condition(column, FilterOp::In, Value::Array(values))
    }

    /// Append ordering parsed from an order spec such as `"created_at desc"`
    pub fn order(mut self, spec: &str) -> Result<Self, FilterError> {
        self.order.extend(FilterOrder::parse(spec)?);
        Ok(self)
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn has_order(&self) -> bool {
        !self.order.is_empty()
    }

    /// Only the conditions, without ordering or page window (for update/delete selectors)
    pub fn selector(&self) -> Self {
        Self { conditions: self.conditions.clone(), ..Default::default() }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        for condition in &self.conditions {
            FilterWhere::validate(condition)?;
        }
        if let Some(limit) = self.limit {
            if limit < 0 {
                return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string()));
            }
        }
        if let Some(offset) = self.offset {
            if offset < 0 {
                return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string()));
            }
        }
        Ok(())
    }

    /// Query-string pairs for a PostgREST request
    pub fn to_query_pairs(&self) -> Result<Vec<(String, String)>, FilterError> {
        self.validate()?;
        let mut pairs = Vec::with_capacity(self.conditions.len() + 3);
        for condition in &self.conditions {
            pairs.push(FilterWhere::render(condition)?);
        }
        if let Some(order) = FilterOrder::render(&self.order) {
            pairs.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        Ok(pairs)
    }

    pub fn matches(&self, record: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|c| FilterWhere::matches(c, record))
    }

    /// Filter, sort and paginate an in-memory row set
    pub fn apply(&self, rows: impl IntoIterator<Item = Map<String, Value>>) -> Vec<Map<String, Value>> {
        let mut matched: Vec<Map<String, Value>> = rows.into_iter().filter(|r| self.matches(r)).collect();
        if self.has_order() {
            matched.sort_by(|a, b| FilterOrder::compare(&self.order, a, b));
        }
        let offset = self.offset.unwrap_or(0).max(0) as usize;
        let iter = matched.into_iter().skip(offset);
        match self.limit {
            Some(limit) => iter.take(limit.max(0) as usize).collect(),
            None => iter.collect(),
        }
    }
}
