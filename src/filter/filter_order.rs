use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_where::{compare_values, validate_column};
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    /// Parse `"created_at desc, name"` (SQL style) or `"created_at.desc,name"` (PostgREST style)
    pub fn parse(spec: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let mut out = Vec::new();
        for part in spec.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let (col, dir) = match trimmed.split_once(|c: char| c == '.' || c.is_whitespace()) {
                Some((col, dir)) => (col.trim(), dir.trim()),
                None => (trimmed, "asc"),
            };
            validate_column(col)?;
            let sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
            out.push(FilterOrderInfo { column: col.to_string(), sort });
        }
        Ok(out)
    }

    /// `order=created_at.desc,name.asc`, or None when no ordering was requested
    pub fn render(infos: &[FilterOrderInfo]) -> Option<String> {
        if infos.is_empty() {
            return None;
        }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{}.{}", i.column, i.sort.as_postgrest()))
            .collect();
        Some(parts.join(","))
    }

    /// Compare two records the way PostgREST orders rows (nulls last on asc, first on desc)
    pub fn compare(infos: &[FilterOrderInfo], a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
        for info in infos {
            let av = a.get(&info.column).unwrap_or(&Value::Null);
            let bv = b.get(&info.column).unwrap_or(&Value::Null);
            let ord = match (av.is_null(), bv.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => compare_values(av, bv).unwrap_or(Ordering::Equal),
            };
            let ord = match info.sort {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}
