//! Application configuration
//!
//! Values are layered: built-in defaults, then an optional JSON or YAML file,
//! then `TASKPILOT_*` environment variables.

use crate::error::{Result, TaskPilotError};
use crate::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use taskpilot_common::{
    parse_bool, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_NAMESPACE, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_HTTP_PORT, DEFAULT_TOKEN_EXPIRY_MINUTES,
};
use tracing::{debug, info};

/// Complete configuration for the API server and CLI
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub provider: ProviderConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_HTTP_PORT,
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding the listener
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where tasks and users are stored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    #[default]
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("Unknown storage backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub storage: StorageKind,
    /// SQLite file, created on first connect
    pub path: PathBuf,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            storage: StorageKind::Sqlite,
            path: PathBuf::from("taskpilot.db"),
            max_connections: 5,
        }
    }
}

/// Which cache backend the store runs on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Disabled,
    #[default]
    Memory,
    Redis,
}

impl FromStr for CacheBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "disabled" | "none" | "off" => Ok(Self::Disabled),
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(format!("Unknown cache backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackendKind,
    pub namespace: String,
    /// Lifetime of every generation entry
    pub ttl_seconds: u64,
    /// Upper bound on entries held by the in-memory backend
    pub max_entries: u64,
    pub redis_host: String,
    pub redis_port: u16,
    pub redis_password: Option<String>,
    pub redis_db: u8,
    pub connect_timeout_ms: u64,
    pub operation_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::Memory,
            namespace: DEFAULT_CACHE_NAMESPACE.to_string(),
            ttl_seconds: DEFAULT_CACHE_TTL_SECS,
            max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            redis_host: "localhost".to_string(),
            redis_port: 6379,
            redis_password: None,
            redis_db: 0,
            connect_timeout_ms: 5000,
            operation_timeout_ms: 5000,
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    /// `redis://[:password@]host:port/db`
    #[must_use]
    pub fn redis_url(&self) -> String {
        let base = format!("redis://{}:{}/{}", self.redis_host, self.redis_port, self.redis_db);
        let Some(password) = self.redis_password.as_deref().filter(|p| !p.is_empty()) else {
            return base;
        };
        match url::Url::parse(&base) {
            Ok(mut parsed) => {
                if parsed.set_password(Some(password)).is_ok() {
                    parsed.to_string()
                } else {
                    base
                }
            }
            Err(_) => base,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    /// Overrides the kind's default model
    pub model: Option<String>,
    /// Overrides the kind's default endpoint
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::Offline,
            api_key: None,
            model: None,
            base_url: None,
            temperature: 0.7,
            max_tokens: None,
            timeout_secs: 30,
        }
    }
}

impl ProviderConfig {
    /// Remote kind with a usable API key
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.kind.is_remote()
            && self
                .api_key
                .as_deref()
                .is_some_and(|key| !key.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_expiry_minutes: u64,
    pub pbkdf2_iterations: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "taskpilot-development-secret".to_string(),
            token_expiry_minutes: DEFAULT_TOKEN_EXPIRY_MINUTES,
            pbkdf2_iterations: 100_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, or error
    pub level: String,
    pub json_logs: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_logs: false,
            log_file: None,
        }
    }
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by environment variables
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparseable value
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Load configuration from a `.json`, `.yaml`, or `.yml` file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TaskPilotError::Io(std::io::Error::other(format!(
                "Failed to read config file {}: {e}",
                path.display()
            )))
        })?;

        if is_yaml(path) {
            serde_yaml::from_str(&content).map_err(|e| {
                TaskPilotError::configuration(format!("Failed to parse YAML config: {e}"))
            })
        } else {
            serde_json::from_str(&content).map_err(|e| {
                TaskPilotError::configuration(format!("Failed to parse JSON config: {e}"))
            })
        }
    }

    /// Save configuration as `"json"` or `"yaml"`
    ///
    /// # Errors
    /// Returns an error for an unknown format or if the file cannot be written
    pub fn to_file<P: AsRef<Path>>(&self, path: P, format: &str) -> Result<()> {
        let path = path.as_ref();
        let content = match format {
            "yaml" | "yml" => serde_yaml::to_string(self).map_err(|e| {
                TaskPilotError::configuration(format!("Failed to serialize YAML: {e}"))
            })?,
            "json" => serde_json::to_string_pretty(self)?,
            other => {
                return Err(TaskPilotError::configuration(format!(
                    "Unsupported format: {other}"
                )))
            }
        };

        std::fs::write(path, content).map_err(|e| {
            TaskPilotError::Io(std::io::Error::other(format!(
                "Failed to write config file {}: {e}",
                path.display()
            )))
        })
    }

    /// Full layered load: defaults, then `path` if given, then the environment
    ///
    /// # Errors
    /// Returns an error if the file or environment is invalid, or if the
    /// result fails [`AppConfig::validate`]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                Self::from_file(path)?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        debug!(
            cache_backend = ?config.cache.backend,
            provider = %config.provider.kind,
            storage = ?config.database.storage,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Override fields from `TASKPILOT_*` variables
    ///
    /// # Errors
    /// Returns an error if a variable holds an unparseable value
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(host) = env_string("TASKPILOT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_parse("TASKPILOT_PORT")? {
            self.server.port = port;
        }

        if let Some(storage) = env_parse("TASKPILOT_STORAGE")? {
            self.database.storage = storage;
        }
        if let Some(path) = env_string("TASKPILOT_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }

        if let Some(backend) = env_parse("TASKPILOT_CACHE_BACKEND")? {
            self.cache.backend = backend;
        }
        if let Some(namespace) = env_string("TASKPILOT_CACHE_NAMESPACE") {
            self.cache.namespace = namespace;
        }
        if let Some(ttl) = env_parse("TASKPILOT_CACHE_TTL")? {
            self.cache.ttl_seconds = ttl;
        }
        if let Some(host) = env_string("TASKPILOT_REDIS_HOST") {
            self.cache.redis_host = host;
        }
        if let Some(port) = env_parse("TASKPILOT_REDIS_PORT")? {
            self.cache.redis_port = port;
        }
        if let Some(password) = env_string("TASKPILOT_REDIS_PASSWORD") {
            self.cache.redis_password = Some(password);
        }
        if let Some(db) = env_parse("TASKPILOT_REDIS_DB")? {
            self.cache.redis_db = db;
        }

        if let Some(kind) = env_parse("TASKPILOT_AI_PROVIDER")? {
            self.provider.kind = kind;
        }
        if let Some(key) = env_string("TASKPILOT_AI_API_KEY") {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = env_string("TASKPILOT_AI_MODEL") {
            self.provider.model = Some(model);
        }
        if let Some(base_url) = env_string("TASKPILOT_AI_BASE_URL") {
            self.provider.base_url = Some(base_url);
        }

        if let Some(secret) = env_string("TASKPILOT_JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(minutes) = env_parse("TASKPILOT_TOKEN_EXPIRY_MINUTES")? {
            self.auth.token_expiry_minutes = minutes;
        }

        if let Some(level) = env_string("TASKPILOT_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Some(json_logs) = env_string("TASKPILOT_JSON_LOGS") {
            self.logging.json_logs = parse_bool(&json_logs);
        }
        if let Some(log_file) = env_string("TASKPILOT_LOG_FILE") {
            self.logging.log_file = Some(PathBuf::from(log_file));
        }

        Ok(())
    }

    /// Validate the configuration
    ///
    /// A remote provider without an API key is accepted; it resolves to the
    /// offline generator at startup.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(TaskPilotError::configuration("Server port must be greater than 0"));
        }

        if self.database.storage == StorageKind::Sqlite {
            if self.database.path.as_os_str().is_empty() {
                return Err(TaskPilotError::configuration("Database path cannot be empty"));
            }
            if self.database.max_connections == 0 {
                return Err(TaskPilotError::configuration(
                    "Database max connections must be greater than 0",
                ));
            }
        }

        if self.cache.ttl_seconds == 0 {
            return Err(TaskPilotError::configuration("Cache TTL must be greater than 0"));
        }
        if self.cache.namespace.trim().is_empty() {
            return Err(TaskPilotError::configuration("Cache namespace cannot be empty"));
        }
        if self.cache.backend == CacheBackendKind::Memory && self.cache.max_entries == 0 {
            return Err(TaskPilotError::configuration(
                "Cache max entries must be greater than 0 for the memory backend",
            ));
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(TaskPilotError::configuration(
                "Provider temperature must be between 0.0 and 2.0",
            ));
        }

        if self.auth.jwt_secret.is_empty() {
            return Err(TaskPilotError::configuration("JWT secret cannot be empty"));
        }
        if self.auth.token_expiry_minutes == 0 {
            return Err(TaskPilotError::configuration(
                "Token expiry must be greater than 0",
            ));
        }
        if self.auth.pbkdf2_iterations == 0 {
            return Err(TaskPilotError::configuration(
                "PBKDF2 iterations must be greater than 0",
            ));
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(TaskPilotError::configuration(format!(
                "Invalid log level: {}. Must be one of: {}",
                self.logging.level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml" | "yml")
    )
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(name)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                TaskPilotError::configuration(format!("Invalid value for {name}: {e}"))
            })
        })
        .transpose()
}
