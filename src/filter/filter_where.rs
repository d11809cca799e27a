use std::cmp::Ordering;

use regex::Regex;
use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo};

pub struct FilterWhere;

impl FilterWhere {
    pub fn validate(condition: &FilterWhereInfo) -> Result<(), FilterError> {
        validate_column(&condition.column)?;
        match condition.operator {
            FilterOp::In => {
                if !condition.data.is_array() {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "in on '{}' requires an array",
                        condition.column
                    )));
                }
            }
            FilterOp::Is => {
                if !(condition.data.is_null() || condition.data.is_boolean()) {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "is on '{}' accepts only null, true or false",
                        condition.column
                    )));
                }
            }
            FilterOp::Like | FilterOp::ILike => {
                if !condition.data.is_string() {
                    return Err(FilterError::InvalidOperatorData(format!(
                        "like on '{}' requires a string pattern",
                        condition.column
                    )));
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Render one condition as a PostgREST query pair, e.g. `("status", "eq.pending")`
    pub fn render(condition: &FilterWhereInfo) -> Result<(String, String), FilterError> {
        Self::validate(condition)?;
        let op = condition.operator.as_postgrest();
        let value = match condition.operator {
            FilterOp::In => {
                let items: Vec<String> = condition
                    .data
                    .as_array()
                    .map(|arr| arr.iter().map(quote_list_item).collect())
                    .unwrap_or_default();
                format!("({})", items.join(","))
            }
            // PostgREST uses `*` as the LIKE wildcard in URLs
            FilterOp::Like | FilterOp::ILike => render_scalar(&condition.data).replace('%', "*"),
            _ => render_scalar(&condition.data),
        };
        Ok((condition.column.clone(), format!("{}.{}", op, value)))
    }

    /// Evaluate one condition against a record, mirroring PostgREST semantics
    pub fn matches(condition: &FilterWhereInfo, record: &Map<String, Value>) -> bool {
        let field = record.get(&condition.column).unwrap_or(&Value::Null);

        match condition.operator {
            FilterOp::Is => match &condition.data {
                Value::Null => field.is_null(),
                Value::Bool(b) => field.as_bool() == Some(*b),
                _ => false,
            },
            FilterOp::In => condition
                .data
                .as_array()
                .map(|arr| arr.iter().any(|v| compare_values(field, v) == Some(Ordering::Equal)))
                .unwrap_or(false),
            FilterOp::Like | FilterOp::ILike => {
                let (Some(text), Some(pattern)) = (field_as_text(field), condition.data.as_str()) else {
                    return false;
                };
                like_regex(pattern, condition.operator == FilterOp::ILike)
                    .map(|re| re.is_match(&text))
                    .unwrap_or(false)
            }
            op => {
                // SQL comparison with NULL never matches
                if field.is_null() || condition.data.is_null() {
                    return false;
                }
                match compare_values(field, &condition.data) {
                    Some(ord) => match op {
                        FilterOp::Eq => ord == Ordering::Equal,
                        FilterOp::Neq => ord != Ordering::Equal,
                        FilterOp::Gt => ord == Ordering::Greater,
                        FilterOp::Gte => ord != Ordering::Less,
                        FilterOp::Lt => ord == Ordering::Less,
                        FilterOp::Lte => ord != Ordering::Greater,
                        _ => false,
                    },
                    None => op == FilterOp::Neq,
                }
            }
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let valid_start = name.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false);
    valid_start && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub(crate) fn validate_column(name: &str) -> Result<(), FilterError> {
    if !is_identifier(name) {
        return Err(FilterError::InvalidColumn(name.to_string()));
    }
    Ok(())
}

pub fn validate_table_name(name: &str) -> Result<(), FilterError> {
    if !is_identifier(name) {
        return Err(FilterError::InvalidTableName(name.to_string()));
    }
    Ok(())
}

fn render_scalar(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn quote_list_item(v: &Value) -> String {
    let raw = render_scalar(v);
    if raw.contains([',', '(', ')', '"']) {
        format!("\"{}\"", raw.replace('"', "\\\""))
    } else {
        raw
    }
}

fn field_as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn like_regex(pattern: &str, case_insensitive: bool) -> Option<Regex> {
    let mut re = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });
    for c in pattern.chars() {
        match c {
            '%' | '*' => re.push_str(".*"),
            '_' => re.push('.'),
            other => re.push_str(&regex::escape(&other.to_string())),
        }
    }
    re.push('$');
    Regex::new(&re).ok()
}

/// Loose comparison between a stored value and a filter value.
///
/// Query-string filters arrive as strings, so `"3"` must equal the number `3`
/// and `"true"` the boolean `true`.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::Number(x), Value::String(s)) => x.as_f64()?.partial_cmp(&s.trim().parse::<f64>().ok()?),
        (Value::String(s), Value::Number(y)) => s.trim().parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::String(s)) => s.parse::<bool>().ok().map(|y| x.cmp(&y)),
        (Value::String(s), Value::Bool(y)) => s.parse::<bool>().ok().map(|x| x.cmp(y)),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}
