use serde::{Deserialize, Serialize};

use super::enums::Role;
use crate::database::record::Record;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing)]
    pub password_hash: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub last_login_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub modified_at: Option<String>,
}

impl Profile {
    pub fn from_record(record: Record) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn password_hash_is_read_but_never_written() {
        let record = json!({
            "id": 3,
            "email": "awa@example.sn",
            "role": "merchant",
            "password_hash": "sha256$salt$abc"
        });
        let profile = Profile::from_record(record.as_object().cloned().unwrap()).unwrap();
        assert_eq!(profile.password_hash.as_deref(), Some("sha256$salt$abc"));
        assert!(profile.is_active);

        let out = serde_json::to_value(&profile).unwrap();
        assert!(out.get("password_hash").is_none());
        assert_eq!(out["role"], json!("merchant"));
    }
}
