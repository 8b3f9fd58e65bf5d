//! Configuration module for Cabinet.

use serde::Deserialize;
use std::path::Path;

use crate::{CabinetError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/cabinet.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Path to the file storage directory.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum upload size per file in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_path() -> String {
    "data/media".to_string()
}

fn default_max_upload_size() -> u64 {
    50
}

impl FilesConfig {
    /// Maximum upload size per file in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/cabinet.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key.
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
}

fn default_jwt_access_expiry() -> u64 {
    3600 // 1 hour
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
        }
    }
}

/// Administrator account created at startup if it does not exist yet.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdminConfig {
    /// Administrator username.
    #[serde(default)]
    pub username: Option<String>,
    /// Administrator password.
    #[serde(default)]
    pub password: Option<String>,
}

impl AdminConfig {
    /// Get the bootstrap credentials when both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some((u, p)),
            _ => None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Bootstrap administrator.
    #[serde(default)]
    pub admin: AdminConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(CabinetError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| CabinetError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `CABINET_JWT_SECRET`: Override the JWT secret key
    /// - `CABINET_ADMIN_PASSWORD`: Override the bootstrap administrator password
    pub fn apply_env_overrides(&mut self) {
        if let Ok(jwt_secret) = std::env::var("CABINET_JWT_SECRET") {
            if !jwt_secret.is_empty() {
                self.web.jwt_secret = jwt_secret;
            }
        }

        if let Ok(password) = std::env::var("CABINET_ADMIN_PASSWORD") {
            if !password.is_empty() {
                self.admin.password = Some(password);
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The JWT secret is not set
    /// - Only one of the bootstrap administrator fields is set
    /// - The upload limit is zero
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(CabinetError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via CABINET_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }

        if self.admin.username.is_some() != self.admin.password.is_some() {
            return Err(CabinetError::Config(
                "[admin] requires both username and password".to_string(),
            ));
        }

        if self.files.max_upload_size_mb == 0 {
            return Err(CabinetError::Config(
                "files.max_upload_size_mb must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, "data/cabinet.db");
        assert_eq!(config.files.storage_path, "data/media");
        assert_eq!(config.files.max_upload_size_mb, 50);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/cabinet.log");
        assert!(config.web.cors_origins.is_empty());
        assert!(config.web.jwt_secret.is_empty());
        assert_eq!(config.web.jwt_access_token_expiry_secs, 3600);
        assert!(config.admin.credentials().is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 3000

[database]
path = "custom/db.sqlite"

[files]
storage_path = "custom/media"
max_upload_size_mb = 20

[logging]
level = "debug"
file = "custom/logs/app.log"

[web]
cors_origins = ["http://localhost:5173"]
jwt_secret = "test-secret-key"
jwt_access_token_expiry_secs = 600

[admin]
username = "admin"
password = "changeme123"
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "custom/db.sqlite");
        assert_eq!(config.files.storage_path, "custom/media");
        assert_eq!(config.files.max_upload_size_mb, 20);
        assert_eq!(config.files.max_upload_size_bytes(), 20 * 1024 * 1024);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.web.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.web.jwt_secret, "test-secret-key");
        assert_eq!(config.web.jwt_access_token_expiry_secs, 600);
        assert_eq!(config.admin.credentials(), Some(("admin", "changeme123")));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[server]
port = 9000
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.path, "data/cabinet.db");
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = Config::parse("[server\nport = ");
        assert!(matches!(result, Err(CabinetError::Config(_))));
    }

    #[test]
    fn test_validate_requires_jwt_secret() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(CabinetError::Config(_))));
    }

    #[test]
    fn test_validate_incomplete_admin() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        config.admin.username = Some("admin".to_string());
        assert!(config.validate().is_err());

        config.admin.password = Some("password123".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_upload_limit() {
        let mut config = Config::default();
        config.web.jwt_secret = "secret".to_string();
        config.files.max_upload_size_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(CabinetError::Io(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[files]\nmax_upload_size_mb = 5\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.files.max_upload_size_mb, 5);
    }
}
