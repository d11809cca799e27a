use std::collections::HashMap;

use crate::error::ApiError;
use crate::filter::FilterData;

use super::ResourceDef;
use crate::middleware::AuthSession;

/// Equality filters every listing understands
const COMMON_FILTERS: &[&str] = &["merchant_id", "customer_id", "status"];

/// Parsed list query: filters plus the page window
#[derive(Debug, Default)]
pub struct ListQuery {
    pub filter: FilterData,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

fn param<'a>(query: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    query.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_number(query: &HashMap<String, String>, key: &str) -> Result<Option<i64>, ApiError> {
    match param(query, key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|n| *n >= 0)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("Le paramètre '{}' doit être un entier positif", key))),
    }
}

/// A bare `YYYY-MM-DD` end date covers the whole day
fn end_of_day(value: &str) -> String {
    if value.len() == 10 {
        format!("{}T23:59:59.999Z", value)
    } else {
        value.to_string()
    }
}

/// `?id=` on collection routes
pub fn query_id(query: &HashMap<String, String>) -> Result<Option<i64>, ApiError> {
    param(query, "id").map(parse_id).transpose()
}

pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ApiError::bad_request("Identifiant invalide"))
}

impl ListQuery {
    pub fn parse(
        def: &ResourceDef,
        query: &HashMap<String, String>,
        session: Option<&AuthSession>,
    ) -> Result<Self, ApiError> {
        let mut filter = FilterData::new();

        for key in COMMON_FILTERS.iter().chain(def.filters) {
            if let Some(value) = param(query, key) {
                filter = filter.eq(*key, value);
            }
        }

        if let Some(start) = param(query, "start_date") {
            filter = filter.gte("created_at", start);
        }
        if let Some(end) = param(query, "end_date") {
            filter = filter.lte("created_at", end_of_day(end));
        }

        let include_inactive = param(query, "include_inactive") == Some("true");
        if def.delete.deactivates() && !include_inactive && !query.contains_key("is_active") {
            filter = filter.eq("is_active", true);
        }

        if let (Some(column), Some(session)) = (def.owner_column, session) {
            if !session.is_admin() {
                filter = filter.eq(column, session.user_id);
            }
        }

        Ok(Self {
            filter,
            limit: parse_number(query, "limit")?,
            offset: parse_number(query, "offset")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOp;
    use crate::handlers::resources::definitions::{CUSTOMERS, ORDERS, USER_SESSIONS};
    use crate::database::models::Role;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn builds_filters_and_window() {
        let q = query(&[("merchant_id", "4"), ("end_date", "2024-05-31"), ("limit", "10"), ("offset", "20")]);
        let parsed = ListQuery::parse(&ORDERS, &q, None).unwrap();

        assert_eq!(parsed.limit, Some(10));
        assert_eq!(parsed.offset, Some(20));
        let end = parsed.filter.conditions.iter().find(|c| c.operator == FilterOp::Lte).unwrap();
        assert_eq!(end.data, serde_json::json!("2024-05-31T23:59:59.999Z"));
        // orders are cancelled, not deactivated
        assert!(parsed.filter.conditions.iter().all(|c| c.column != "is_active"));
    }

    #[test]
    fn hides_inactive_rows_unless_asked() {
        let parsed = ListQuery::parse(&CUSTOMERS, &query(&[]), None).unwrap();
        assert!(parsed.filter.conditions.iter().any(|c| c.column == "is_active"));

        let parsed = ListQuery::parse(&CUSTOMERS, &query(&[("include_inactive", "true")]), None).unwrap();
        assert!(parsed.filter.conditions.is_empty());
    }

    #[test]
    fn scopes_sessions_to_caller_unless_admin() {
        let caller = AuthSession { session_id: 1, user_id: 9, role: Role::Merchant, merchant_id: None };
        let parsed = ListQuery::parse(&USER_SESSIONS, &query(&[]), Some(&caller)).unwrap();
        assert!(parsed.filter.conditions.iter().any(|c| c.column == "user_id"));

        let admin = AuthSession { role: Role::Admin, ..caller };
        let parsed = ListQuery::parse(&USER_SESSIONS, &query(&[]), Some(&admin)).unwrap();
        assert!(parsed.filter.conditions.iter().all(|c| c.column != "user_id"));
    }

    #[test]
    fn rejects_bad_window() {
        assert!(ListQuery::parse(&ORDERS, &query(&[("limit", "-1")]), None).is_err());
        assert!(ListQuery::parse(&ORDERS, &query(&[("offset", "abc")]), None).is_err());
    }
}
