//! Configuration for the `FeelMate` service and terminal client.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Default service port.
pub const DEFAULT_PORT: u16 = 8001;
/// Default service base URL used by the client.
pub const DEFAULT_API_URL: &str = "http://localhost:8001";
/// Default Better Auth base URL.
pub const DEFAULT_AUTH_URL: &str = "http://localhost:3000";

/// Environment variable overriding the service port.
const PORT_ENV: &str = "FEELMATE_PORT";
/// Environment variable overriding the `SQLite` path.
const DB_PATH_ENV: &str = "FEELMATE_DB_PATH";
/// Environment variable overriding the inactivity timeout.
const SESSION_TIMEOUT_ENV: &str = "FEELMATE_SESSION_TIMEOUT_MINUTES";
/// Environment variable overriding the chat API base URL.
const API_URL_ENV: &str = "FEELMATE_API_URL";
/// Environment variable overriding the auth base URL.
const AUTH_URL_ENV: &str = "FEELMATE_AUTH_URL";
/// Environment variable overriding the theme file location.
const THEME_FILE_ENV: &str = "FEELMATE_THEME_FILE";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// A URL setting does not parse.
    #[error("invalid url for {field}: {source}")]
    Url {
        /// Setting name.
        field: &'static str,
        /// Parse failure.
        source: url::ParseError,
    },
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FeelmateConfig {
    /// Emotion-support service settings.
    pub server: ServerConfig,
    /// Terminal client settings.
    pub client: ClientConfig,
}

impl FeelmateConfig {
    /// Defaults overridden by `FEELMATE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(port) = env_parse::<u16>(PORT_ENV) {
            config.server.port = port;
        }
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            config.server.sqlite_path = PathBuf::from(path);
        }
        if let Some(minutes) = env_parse::<u64>(SESSION_TIMEOUT_ENV) {
            config.server.session_timeout_minutes = minutes;
        }
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.client.api_base_url = url;
        }
        if let Ok(url) = std::env::var(AUTH_URL_ENV) {
            config.client.auth_base_url = url;
        }
        if let Ok(path) = std::env::var(THEME_FILE_ENV) {
            config.client.theme_file = PathBuf::from(path);
        }

        config
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.client.validate()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

/// Settings of the emotion-support service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listening port.
    pub port: u16,
    /// `SQLite` database file.
    pub sqlite_path: PathBuf,
    /// Minutes of inactivity before a session is marked inactive.
    pub session_timeout_minutes: u64,
    /// Hours an inactive session is kept before it is purged.
    pub purge_after_hours: u64,
    /// Seconds between background cleanup runs.
    pub cleanup_interval_seconds: u64,
    /// Origin allowed by CORS, `None` allows any.
    pub allowed_origin: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            sqlite_path: PathBuf::from("data/feelmate.sqlite3"),
            session_timeout_minutes: 30,
            purge_after_hours: 24,
            cleanup_interval_seconds: 300,
            allowed_origin: Some(DEFAULT_AUTH_URL.to_string()),
        }
    }
}

impl ServerConfig {
    /// Set the listening port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the inactivity timeout.
    #[must_use]
    pub const fn with_session_timeout_minutes(mut self, minutes: u64) -> Self {
        self.session_timeout_minutes = minutes;
        self
    }

    /// Inactivity timeout as a duration.
    #[must_use]
    pub const fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_minutes * 60)
    }

    /// Purge horizon as a duration.
    #[must_use]
    pub const fn purge_after(&self) -> Duration {
        Duration::from_secs(self.purge_after_hours * 3600)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_timeout_minutes == 0 {
            return Err(ConfigError::Invalid(
                "server.session_timeout_minutes must be > 0".to_string(),
            ));
        }
        if self.purge_after_hours * 60 < self.session_timeout_minutes {
            return Err(ConfigError::Invalid(
                "server.purge_after_hours must not be shorter than the session timeout".to_string(),
            ));
        }
        if self.cleanup_interval_seconds == 0 {
            return Err(ConfigError::Invalid(
                "server.cleanup_interval_seconds must be > 0".to_string(),
            ));
        }
        if let Some(origin) = &self.allowed_origin {
            Url::parse(origin).map_err(|source| ConfigError::Url {
                field: "server.allowed_origin",
                source,
            })?;
        }
        Ok(())
    }
}

/// Settings of the terminal client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the emotion-support service.
    pub api_base_url: String,
    /// Base URL of the Better Auth server.
    pub auth_base_url: String,
    /// Request timeout.
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,
    /// File holding the persisted theme preference.
    pub theme_file: PathBuf,
    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            auth_base_url: DEFAULT_AUTH_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            theme_file: default_theme_file(),
            user_agent: format!("feelmate/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Set the chat API base URL.
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Set the auth base URL.
    #[must_use]
    pub fn with_auth_base_url(mut self, url: impl Into<String>) -> Self {
        self.auth_base_url = url.into();
        self
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.api_base_url).map_err(|source| ConfigError::Url {
            field: "client.api_base_url",
            source,
        })?;
        Url::parse(&self.auth_base_url).map_err(|source| ConfigError::Url {
            field: "client.auth_base_url",
            source,
        })?;
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "client.request_timeout must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_theme_file() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map_or_else(|| PathBuf::from("."), PathBuf::from);
    home.join(".feelmate").join("preferences.json")
}

/// Serde module for Duration serialization.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = FeelmateConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.server.session_timeout_minutes, 30);
        assert_eq!(config.server.purge_after_hours, 24);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = FeelmateConfig::default();
        config.server = config.server.with_session_timeout_minutes(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_bad_api_url_rejected() {
        let mut config = FeelmateConfig::default();
        config.client = config.client.with_api_base_url("not a url");
        assert!(matches!(config.validate(), Err(ConfigError::Url { .. })));
    }

    #[test]
    fn test_client_builder() {
        let client = ClientConfig::default()
            .with_api_base_url("http://127.0.0.1:9000")
            .with_auth_base_url("http://127.0.0.1:9001")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(client.api_base_url, "http://127.0.0.1:9000");
        assert_eq!(client.auth_base_url, "http://127.0.0.1:9001");
        assert_eq!(client.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_durations() {
        let server = ServerConfig::default();
        assert_eq!(server.session_timeout(), Duration::from_secs(30 * 60));
        assert_eq!(server.purge_after(), Duration::from_secs(24 * 3600));
    }
}
