//! Server configuration types.

use bastion_common_core::{ResourceId, Role, UserId};
use bastion_common_log::{LogConfig, LogFormat, LogLevel};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

use super::validation::ConfigError;

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server binding configuration.
    #[serde(default)]
    pub server: ServerBindConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Audit trail configuration.
    #[serde(default)]
    pub audit: AuditConfig,
    /// Permission table override. Empty means the built-in table.
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
    /// Records loaded into the in-memory stores at startup.
    #[serde(default)]
    pub seed: SeedConfig,
}

/// Server binding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerBindConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerBindConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerBindConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(format!("{}:{}", self.host, self.port)))
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret used to verify bearer tokens.
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry (seconds).
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
    /// Refresh token expiry (seconds).
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    3600 // 1 hour
}

fn default_refresh_token_expiry() -> u64 {
    604800 // 7 days
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_expiry_secs: default_access_token_expiry(),
            refresh_token_expiry_secs: default_refresh_token_expiry(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty, compact or json).
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Optional JSON log file.
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Attach redacted JSON response bodies to the exit line.
    #[serde(default = "default_true")]
    pub log_response_bodies: bool,
    /// Bodies larger than this are never captured.
    #[serde(default = "default_max_logged_body")]
    pub max_logged_body_bytes: usize,
    /// Paths that produce no entry or exit lines.
    #[serde(default)]
    pub exclude_paths: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_logged_body() -> usize {
    16 * 1024
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            file: None,
            log_response_bodies: true,
            max_logged_body_bytes: default_max_logged_body(),
            exclude_paths: Vec::new(),
        }
    }
}

impl LoggingConfig {
    /// Subscriber settings for this configuration.
    ///
    /// `BASTION_LOG_*` variables still win over the file, the same way they
    /// do for every other Bastion binary.
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig {
            level: LogLevel::parse(&self.level).unwrap_or_default(),
            format: LogFormat::parse(&self.format),
            file_path: self.file.clone(),
            ..LogConfig::default()
        };

        let env = LogConfig::from_env();
        if std::env::var("BASTION_LOG_LEVEL").is_ok() {
            config.level = env.level;
        }
        if std::env::var("BASTION_LOG_FORMAT").is_ok() {
            config.format = env.format;
        }
        if env.file_path.is_some() {
            config.file_path = env.file_path;
        }
        config.source_location = env.source_location;
        config
    }

    /// Whether request lines should be skipped for `path`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_paths.iter().any(|p| p == path)
    }
}

/// Where audit entries are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSinkKind {
    /// Keep entries in process memory.
    #[default]
    Memory,
    /// Append JSON lines to `audit.path`.
    File,
}

/// Audit trail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Sink backend.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// File used by the `file` sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Entries buffered between capture and the writer.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    10_000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            sink: AuditSinkKind::default(),
            path: None,
            buffer_size: default_buffer_size(),
        }
    }
}

/// One row of a permission table override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    /// Permission key, `category:action`.
    pub key: String,
    /// Roles granted the permission.
    pub roles: Vec<Role>,
}

/// Startup records for the in-memory stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedConfig {
    #[serde(default)]
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub posts: Vec<SeedPost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub role: Role,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPost {
    #[serde(default)]
    pub id: Option<ResourceId>,
    pub owner_id: UserId,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_true")]
    pub is_published: bool,
}
