//! Configuration validation.

use super::types::{AuditSinkKind, ServerConfig};
use crate::middleware::authz::PermissionTable;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWT secret: must be at least 32 characters")]
    InvalidJwtSecret,

    #[error("Token expiry must be greater than zero")]
    InvalidTokenExpiry,

    #[error("Invalid port: {0}")]
    InvalidPort(u16),

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("File audit sink selected but audit.path not provided")]
    MissingAuditPath,

    #[error("Audit buffer size must be greater than zero")]
    InvalidAuditBuffer,

    #[error("Invalid permission table: {0}")]
    InvalidPermissions(String),
}

/// Validate server configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.auth.jwt_secret.len() < 32 {
        errors.push(ConfigError::InvalidJwtSecret);
    }

    if config.auth.access_token_expiry_secs == 0 || config.auth.refresh_token_expiry_secs == 0 {
        errors.push(ConfigError::InvalidTokenExpiry);
    }

    if config.server.port == 0 {
        errors.push(ConfigError::InvalidPort(0));
    } else if let Err(e) = config.server.socket_addr() {
        errors.push(e);
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.to_lowercase().as_str()) {
        errors.push(ConfigError::InvalidLogLevel(config.logging.level.clone()));
    }

    if config.audit.sink == AuditSinkKind::File && config.audit.path.is_none() {
        errors.push(ConfigError::MissingAuditPath);
    }

    if config.audit.buffer_size == 0 {
        errors.push(ConfigError::InvalidAuditBuffer);
    }

    if !config.permissions.is_empty() {
        if let Err(e) = PermissionTable::from_grants(&config.permissions) {
            errors.push(ConfigError::InvalidPermissions(e.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;
    use bastion_common_core::Role;
    use std::path::PathBuf;

    fn test_config() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.auth.jwt_secret = "a".repeat(32);
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&test_config()).is_ok());
    }

    #[test]
    fn test_invalid_jwt_secret() {
        let mut config = test_config();
        config.auth.jwt_secret = "short".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidJwtSecret)));
    }

    #[test]
    fn test_zero_token_expiry() {
        let mut config = test_config();
        config.auth.refresh_token_expiry_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidTokenExpiry)));
    }

    #[test]
    fn test_invalid_port() {
        let mut config = test_config();
        config.server.port = 0;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidPort(0))));
    }

    #[test]
    fn test_invalid_bind_address() {
        let mut config = test_config();
        config.server.host = "not a host".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidBindAddress(_))));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = test_config();
        config.logging.level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidLogLevel(_))));
    }

    #[test]
    fn test_file_sink_requires_path() {
        let mut config = test_config();
        config.audit.sink = AuditSinkKind::File;

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::MissingAuditPath)));

        config.audit.path = Some(PathBuf::from("/tmp/audit.jsonl"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_malformed_permission_key() {
        let mut config = test_config();
        config.permissions = vec![PermissionGrant {
            key: "posts".to_string(),
            roles: vec![Role::Admin],
        }];

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ConfigError::InvalidPermissions(_))));
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = test_config();
        config.auth.jwt_secret.clear();
        config.audit.buffer_size = 0;

        assert_eq!(validate_config(&config).unwrap_err().len(), 2);
    }
}
