use anyhow::{Result, anyhow};
use serde::Deserialize;
use std::env;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

/// Backend endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request deadline in seconds. Unset means no deadline, matching the
    /// browser client this replaces.
    pub timeout_secs: Option<u64>,
}

/// Durable session slot and user identity configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub storage_path: String,
    /// User id used for quiz and dashboard calls until the backend starts
    /// issuing one inside the login response.
    pub fallback_user_id: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        Ok(Config {
            api: ApiConfig::from_env()?,
            session: SessionConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
        })
    }

    /// Log a summary of the loaded configuration. Called by the binary once
    /// the subscriber is installed.
    pub fn log_summary(&self) {
        info!(
            base_url = %self.api.base_url,
            timeout_secs = ?self.api.timeout_secs,
            storage_path = %self.session.storage_path,
            user_id = %self.session.fallback_user_id,
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://") {
            return Err(anyhow!(
                "TOEFL_API_URL must start with 'http://' or 'https://'"
            ));
        }

        if self.api.timeout_secs == Some(0) {
            return Err(anyhow!("TOEFL_API_TIMEOUT_SECS must be greater than 0"));
        }

        if self.session.storage_path.trim().is_empty() {
            return Err(anyhow!("SESSION_FILE must not be empty"));
        }

        let level_head = self
            .logging
            .level
            .split(',')
            .next()
            .unwrap_or("")
            .to_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level_head.as_str()) {
            warn!(
                "Invalid log level '{}', using 'info' as fallback",
                self.logging.level
            );
        }

        Ok(())
    }
}

impl ApiConfig {
    fn from_env() -> Result<Self> {
        Self::from_values(
            env::var("TOEFL_API_URL").ok(),
            env::var("TOEFL_API_TIMEOUT_SECS").ok(),
        )
    }

    // Env reads stay in `from_env`; parsing is pure so tests never have to
    // mutate process-global variables.
    fn from_values(base_url: Option<String>, timeout_raw: Option<String>) -> Result<Self> {
        let base_url = base_url.unwrap_or_else(|| "http://localhost:8000".to_string());

        let timeout_secs = match timeout_raw {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| {
                anyhow!("Invalid TOEFL_API_TIMEOUT_SECS value: '{}'. Must be a number of seconds", raw)
            })?),
            None => None,
        };

        Ok(ApiConfig {
            base_url,
            timeout_secs,
        })
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl SessionConfig {
    fn from_env() -> Result<Self> {
        Ok(Self::from_values(
            env::var("SESSION_FILE").ok(),
            env::var("TOEFL_USER_ID").ok(),
        ))
    }

    fn from_values(storage_path: Option<String>, user_id: Option<String>) -> Self {
        SessionConfig {
            storage_path: storage_path.unwrap_or_else(|| "toefl-session.json".to_string()),
            fallback_user_id: user_id.unwrap_or_else(|| format!("guest-{}", Uuid::new_v4())),
        }
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info,toefl_trainer=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY").unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_config_defaults() {
        let config = ApiConfig::from_values(None, None).unwrap();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout_secs, None);
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_api_config_parses_timeout_seconds() {
        let config = ApiConfig::from_values(
            Some("https://api.example.com".to_string()),
            Some("30".to_string()),
        )
        .unwrap();
        assert_eq!(config.base_url, "https://api.example.com");
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_timeout_parsing() {
        let result = ApiConfig::from_values(None, Some("soon".to_string()));
        assert!(result.is_err());
    }

    #[test]
    fn test_fallback_user_id_is_generated_when_unset() {
        let config = SessionConfig::from_values(None, None);
        assert!(config.fallback_user_id.starts_with("guest-"));

        let config = SessionConfig::from_values(None, Some("demo-user".to_string()));
        assert_eq!(config.fallback_user_id, "demo-user");
    }

    #[test]
    fn test_config_validation() {
        let config = Config {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: Some(30),
            },
            session: SessionConfig {
                storage_path: "toefl-session.json".to_string(),
                fallback_user_id: "demo-user".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
        };
        assert!(config.validate().is_ok());

        let mut bad_url = config.clone();
        bad_url.api.base_url = "localhost:8000".to_string();
        assert!(bad_url.validate().is_err());

        let mut zero_timeout = config.clone();
        zero_timeout.api.timeout_secs = Some(0);
        assert!(zero_timeout.validate().is_err());

        let mut empty_path = config;
        empty_path.session.storage_path = "  ".to_string();
        assert!(empty_path.validate().is_err());
    }
}
