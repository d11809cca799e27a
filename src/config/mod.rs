use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub data_api: DataApiConfig,
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Where records live. `url == "memory"` selects the in-process store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataApiConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub default_limit: i64,
    pub max_limit: i64,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub expiry_days: i64,
    pub cookie_name: String,
    pub header_name: String,
    pub trial_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    pub secure_cookies: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Data API overrides
        if let Ok(v) = env::var("DATA_API_URL") {
            if !v.trim().is_empty() {
                self.data_api.url = v.trim().to_string();
            }
        }
        if let Ok(v) = env::var("DATA_API_KEY") {
            self.data_api.api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Ok(v) = env::var("DATA_API_TIMEOUT_SECS") {
            self.data_api.timeout_secs = v.parse().unwrap_or(self.data_api.timeout_secs);
        }

        // API overrides
        if let Ok(v) = env::var("API_DEFAULT_LIMIT") {
            self.api.default_limit = v.parse().unwrap_or(self.api.default_limit);
        }
        if let Ok(v) = env::var("API_MAX_LIMIT") {
            self.api.max_limit = v.parse().unwrap_or(self.api.max_limit);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_EXPIRY_DAYS") {
            self.session.expiry_days = v.parse().unwrap_or(self.session.expiry_days);
        }
        if let Ok(v) = env::var("SESSION_COOKIE_NAME") {
            self.session.cookie_name = v;
        }
        if let Ok(v) = env::var("SESSION_HEADER_NAME") {
            self.session.header_name = v.to_ascii_lowercase();
        }
        if let Ok(v) = env::var("TRIAL_DAYS") {
            self.session.trial_days = v.parse().unwrap_or(self.session.trial_days);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("SECURITY_SECURE_COOKIES") {
            self.security.secure_cookies = v.parse().unwrap_or(self.security.secure_cookies);
        }

        self
    }

    fn session_defaults() -> SessionConfig {
        SessionConfig {
            expiry_days: 7,
            cookie_name: "session_token".to_string(),
            header_name: "x-session-token".to_string(),
            trial_days: 14,
        }
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            data_api: DataApiConfig {
                url: "memory".to_string(),
                api_key: None,
                timeout_secs: 30,
            },
            api: ApiConfig {
                default_limit: 50,
                max_limit: 1000,
                enable_request_logging: true,
            },
            session: Self::session_defaults(),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
                secure_cookies: false,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            data_api: DataApiConfig {
                url: "http://localhost:3001".to_string(),
                api_key: None,
                timeout_secs: 10,
            },
            api: ApiConfig {
                default_limit: 50,
                max_limit: 500,
                enable_request_logging: true,
            },
            session: Self::session_defaults(),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.wakaa.app".to_string()],
                secure_cookies: true,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            data_api: DataApiConfig {
                url: "http://localhost:3001".to_string(),
                api_key: None,
                timeout_secs: 5,
            },
            api: ApiConfig {
                default_limit: 20,
                max_limit: 100,
                enable_request_logging: false,
            },
            session: Self::session_defaults(),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://app.wakaa.app".to_string()],
                secure_cookies: true,
            },
        }
    }

    pub fn uses_memory_store(&self) -> bool {
        self.data_api.url.eq_ignore_ascii_case("memory")
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.uses_memory_store());
        assert_eq!(config.api.max_limit, 1000);
        assert_eq!(config.session.expiry_days, 7);
        assert!(!config.security.secure_cookies);
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.uses_memory_store());
        assert_eq!(config.api.max_limit, 100);
        assert!(config.security.secure_cookies);
        assert_eq!(config.session.cookie_name, "session_token");
    }
}
