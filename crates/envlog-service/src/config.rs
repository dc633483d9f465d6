//! Server configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use envlog_core::{DEFAULT_FILTER_COUNT, DEFAULT_FILTER_SCAN_LIMIT, DEFAULT_GRID_SCAN_LIMIT};
use envlog_store::Backend;

/// Environment variable overriding `time.timezone`.
pub const TIMEZONE_ENV: &str = "ENVLOG_TIMEZONE";
/// Environment variable overriding `security.api_key`.
pub const API_KEY_ENV: &str = "ENVLOG_API_KEY";

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server settings.
    pub server: ServerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
    /// Ingest authentication.
    pub security: SecurityConfig,
    /// Time zone used for date bucketing.
    pub time: TimeConfig,
    /// Scan limits and query defaults.
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Apply `ENVLOG_TIMEZONE` and `ENVLOG_API_KEY` from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(tz) = var(TIMEZONE_ENV) {
            self.time.timezone = tz;
        }
        if let Some(key) = var(API_KEY_ENV) {
            self.security.api_key = Some(key);
        }
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Server bind address is valid (host:port format)
    /// - Storage path, if set, is not empty
    /// - API key, if set, is not blank
    /// - Query limits are positive and the default count fits the scan
    ///
    /// An unknown time zone is not an error; it falls back to UTC at startup.
    ///
    /// # Example
    ///
    /// ```
    /// use envlog_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.security.validate());
        errors.extend(self.query.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Load and validate configuration from a file.
    pub fn load_validated<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1:8080").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

impl ServerConfig {
    /// Validate server configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        match self.bind.rsplit_once(':') {
            None => errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            )),
            Some((_, port)) => match port.parse::<u16>() {
                Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
                Err(_) => errors.push(ValidationError::new(
                    "server.bind",
                    format!("invalid port '{}': must be a number 1-65535", port),
                )),
                Ok(_) => {}
            },
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage backend.
    pub backend: Backend,
    /// Database file (sqlite) or log directory (jsonl). Defaults to the
    /// platform data directory for the backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// The configured path, or the backend's default location.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| self.backend.default_path())
    }

    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Some(path) = &self.path
            && path.as_os_str().is_empty()
        {
            errors.push(ValidationError::new(
                "storage.path",
                "storage path cannot be empty (omit it to use the default)",
            ));
        }

        errors
    }
}

/// Ingest authentication.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Shared secret required in `X-API-Key` on `POST /data`. Unset means
    /// ingest is open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl SecurityConfig {
    /// Validate security configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Some(key) = &self.api_key
            && key.trim().is_empty()
        {
            errors.push(ValidationError::new(
                "security.api_key",
                "API key cannot be blank (omit it to disable the check)",
            ));
        }

        errors
    }
}

/// Time zone configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// IANA zone identifier (e.g., "America/Santiago").
    pub timezone: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

/// Query limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Most recent readings scanned to build a grid.
    pub grid_scan_limit: usize,
    /// Most recent readings scanned for a filtered history query.
    pub filter_scan_limit: usize,
    /// Rows returned by `/history` and `/history/filtered` without `count`.
    pub history_default_count: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            grid_scan_limit: DEFAULT_GRID_SCAN_LIMIT,
            filter_scan_limit: DEFAULT_FILTER_SCAN_LIMIT,
            history_default_count: DEFAULT_FILTER_COUNT,
        }
    }
}

impl QueryConfig {
    /// Validate query configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("query.grid_scan_limit", self.grid_scan_limit),
            ("query.filter_scan_limit", self.filter_scan_limit),
            ("query.history_default_count", self.history_default_count),
        ] {
            if value == 0 {
                errors.push(ValidationError::new(field, "must be greater than 0"));
            }
        }

        if self.history_default_count > self.filter_scan_limit {
            errors.push(ValidationError::new(
                "query.history_default_count",
                format!(
                    "default count {} exceeds filter scan limit {}",
                    self.history_default_count, self.filter_scan_limit
                ),
            ));
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `query.grid_scan_limit`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("envlog")
        .join("server.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.storage.backend, Backend::Sqlite);
        assert!(config.storage.path.is_none());
        assert!(config.security.api_key.is_none());
        assert_eq!(config.time.timezone, "UTC");
        assert_eq!(config.query.grid_scan_limit, 8000);
        assert_eq!(config.query.filter_scan_limit, 20000);
        assert_eq!(config.query.history_default_count, 200);
    }

    #[test]
    fn test_storage_resolved_path() {
        let config = StorageConfig::default();
        assert_eq!(config.resolved_path(), Backend::Sqlite.default_path());

        let config = StorageConfig {
            backend: Backend::Jsonl,
            path: Some(PathBuf::from("/srv/envlog")),
        };
        assert_eq!(config.resolved_path(), PathBuf::from("/srv/envlog"));
    }

    #[test]
    fn test_config_full_toml() {
        let toml = r#"
            [server]
            bind = "0.0.0.0:5000"

            [storage]
            backend = "jsonl"
            path = "/data/envlog"

            [security]
            api_key = "shared-secret"

            [time]
            timezone = "America/Santiago"

            [query]
            grid_scan_limit = 1000
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:5000");
        assert_eq!(config.storage.backend, Backend::Jsonl);
        assert_eq!(config.storage.path, Some(PathBuf::from("/data/envlog")));
        assert_eq!(config.security.api_key.as_deref(), Some("shared-secret"));
        assert_eq!(config.time.timezone, "America/Santiago");
        assert_eq!(config.query.grid_scan_limit, 1000);
        // Unset fields keep their defaults
        assert_eq!(config.query.filter_scan_limit, 20000);
    }

    #[test]
    fn test_config_partial_toml() {
        let config: Config = toml::from_str("[time]\ntimezone = \"Europe/Madrid\"\n").unwrap();
        assert_eq!(config.time.timezone, "Europe/Madrid");
        assert_eq!(config.server.bind, "127.0.0.1:8080");
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("server.toml");

        let mut config = Config::default();
        config.server.bind = "0.0.0.0:9090".to_string();
        config.storage.path = Some(PathBuf::from("/tmp/test.db"));
        config.security.api_key = Some("k".to_string());

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(loaded.server.bind, "0.0.0.0:9090");
        assert_eq!(loaded.storage.path, Some(PathBuf::from("/tmp/test.db")));
        assert_eq!(loaded.security.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result: Result<Config, _> = toml::from_str("[storage]\nbackend = \"postgres\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (TIMEZONE_ENV, "Asia/Tokyo"),
            (API_KEY_ENV, "from-env"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));
        assert_eq!(config.time.timezone, "Asia/Tokyo");
        assert_eq!(config.security.api_key.as_deref(), Some("from-env"));
    }

    #[test]
    fn test_blank_overrides_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.time.timezone, "UTC");
        assert!(config.security.api_key.is_none());
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("envlog/server.toml"));
    }

    // ==========================================================================
    // Validation tests
    // ==========================================================================

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_server_bind_validation() {
        let ok = |bind: &str| {
            ServerConfig {
                bind: bind.to_string(),
            }
            .validate()
        };

        assert!(ok("127.0.0.1:8080").is_empty());
        assert!(ok("[::1]:8080").is_empty());
        assert!(ok("localhost:8080").is_empty());

        let errors = ok("");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot be empty"));

        let errors = ok("127.0.0.1");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("host:port"));

        let errors = ok("127.0.0.1:0");
        assert!(errors[0].message.contains("cannot be 0"));

        let errors = ok("127.0.0.1:abc");
        assert!(errors[0].message.contains("must be a number"));
    }

    #[test]
    fn test_storage_path_validation() {
        let empty = StorageConfig {
            backend: Backend::Sqlite,
            path: Some(PathBuf::new()),
        };
        let errors = empty.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "storage.path");
    }

    #[test]
    fn test_blank_api_key_rejected() {
        let security = SecurityConfig {
            api_key: Some("   ".to_string()),
        };
        assert_eq!(security.validate().len(), 1);
    }

    #[test]
    fn test_query_validation() {
        let query = QueryConfig {
            grid_scan_limit: 0,
            filter_scan_limit: 100,
            history_default_count: 200,
        };
        let errors = query.validate();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.field == "query.grid_scan_limit"));
        assert!(errors.iter().any(|e| e.message.contains("exceeds")));
    }

    #[test]
    fn test_config_validation_error_display() {
        let mut config = Config::default();
        config.server.bind = "nope".to_string();
        config.query.grid_scan_limit = 0;

        let Err(error) = config.validate() else {
            panic!("expected validation failure");
        };
        let display = format!("{}", error);
        assert!(display.contains("server.bind"));
        assert!(display.contains("query.grid_scan_limit"));
    }
}
