use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::record::Record;

/// Row of `user_sessions`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSession {
    pub id: i64,
    pub user_id: i64,
    pub session_token: String,
    pub expires_at: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub last_activity_at: Option<String>,
}

impl UserSession {
    pub fn from_record(record: Record) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(record))
    }

    /// Expiry as UTC; `timestamp without time zone` columns come back without an offset
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.expires_at)
    }

    /// Sessions with an unreadable expiry are treated as expired
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_utc().map_or(true, |exp| exp <= now)
    }
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Show only the first characters of a session token
pub fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(8).collect();
    format!("{}…", visible)
}
