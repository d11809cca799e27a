use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SESSION_FILE: &str = "session.json";

/// Token saved by `auth login` / `auth register`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSession {
    pub url: String,
    pub token: String,
    pub email: Option<String>,
    pub expires_at: Option<String>,
    pub saved_at: DateTime<Utc>,
}

impl SavedSession {
    pub fn new(url: &str, token: String, email: Option<String>, expires_at: Option<String>) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            token,
            email,
            expires_at,
            saved_at: Utc::now(),
        }
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("WAKAA_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("wakaa").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<Option<SavedSession>> {
    let session_file = get_config_dir()?.join(SESSION_FILE);

    if !session_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(session_file)?;
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn save_session(session: &SavedSession) -> anyhow::Result<()> {
    let session_file = get_config_dir()?.join(SESSION_FILE);

    let content = serde_json::to_string_pretty(session)?;
    write_private(&session_file, &content)?;
    Ok(())
}

/// Write a file only the owner can read
fn write_private(path: &Path, content: &str) -> std::io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;

    // mode() only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content.as_bytes())
}

pub fn clear_session() -> anyhow::Result<()> {
    let session_file = get_config_dir()?.join(SESSION_FILE);

    if session_file.exists() {
        fs::remove_file(session_file)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("wakaa-cli-{}", uuid::Uuid::new_v4().simple()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(SESSION_FILE);

        // An older, world-readable file is tightened on rewrite
        fs::write(&path, "{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_private(&path, r#"{"token":"secret"}"#).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"token":"secret"}"#);

        fs::remove_dir_all(&dir).unwrap();
    }
}
