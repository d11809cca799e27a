use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A row as exchanged with the data API
pub type Record = Map<String, Value>;

/// Fields owned by the CRUD layer, never accepted from API input
pub const SYSTEM_FIELDS: &[&str] = &["id", "created_at", "modified_at"];

/// Errors that can occur while turning request JSON into a record
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
}

/// RFC 3339 timestamp in UTC with millisecond precision
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accept a JSON object as a record, rejecting arrays and scalars
pub fn from_json(value: Value) -> Result<Record, RecordError> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(RecordError::InvalidJson("Expected JSON object".to_string())),
    }
}

/// Remove system fields from user-supplied input
pub fn strip_system_fields(record: &mut Record) {
    for field in SYSTEM_FIELDS {
        record.remove(*field);
    }
}

/// Remove secrets before a record leaves the API
pub fn redact(record: &mut Record, fields: &[&str]) {
    for field in fields {
        record.remove(*field);
    }
}

/// Integer id of a record; PostgREST returns bigint ids as numbers, query strings carry them as text
pub fn record_id(record: &Record) -> Option<i64> {
    value_as_i64(record.get("id")?)
}

pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn get_str<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get(key).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_system_fields_only() {
        let mut r = from_json(json!({"id": 1, "created_at": "x", "modified_at": "y", "name": "Awa"})).unwrap();
        strip_system_fields(&mut r);
        assert_eq!(r.len(), 1);
        assert_eq!(r["name"], json!("Awa"));
    }

    #[test]
    fn rejects_non_objects() {
        assert!(from_json(json!([1, 2])).is_err());
        assert!(from_json(json!("x")).is_err());
    }

    #[test]
    fn reads_ids_from_numbers_and_strings() {
        let r = from_json(json!({"id": "42"})).unwrap();
        assert_eq!(record_id(&r), Some(42));
        let r = from_json(json!({"id": 7})).unwrap();
        assert_eq!(record_id(&r), Some(7));
        let r = from_json(json!({"id": "abc"})).unwrap();
        assert_eq!(record_id(&r), None);
    }

    #[test]
    fn timestamps_are_utc() {
        assert!(now_timestamp().ends_with('Z'));
    }
}
