//! Shared application state.

use crate::config::{AuditSinkKind, AuthConfig, LoggingConfig, ServerConfig};
use crate::directory::{MemoryDirectory, UserRecord};
use crate::middleware::auth::TokenDecoder;
use crate::middleware::authz::{AuthzLayer, PermissionTable, RegistryError};
use crate::store::{MemoryResourceStore, OwnedResource, Post};
use anyhow::{Context, Result};
use bastion_audit_capture::{
    AuditCapture, AuditEntry, AuditSink, CaptureConfig, JsonLinesAuditSink, MemoryAuditSink,
};
use bastion_common_core::{ResourceId, Role};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Lifetimes, in seconds, of the tokens the refresh route signs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access_secs: i64,
    pub refresh_secs: i64,
}

impl TokenLifetimes {
    fn from_config(auth: &AuthConfig) -> Result<Self> {
        Ok(Self {
            access_secs: i64::try_from(auth.access_token_expiry_secs)
                .context("auth.access_token_expiry_secs is out of range")?,
            refresh_secs: i64::try_from(auth.refresh_token_expiry_secs)
                .context("auth.refresh_token_expiry_secs is out of range")?,
        })
    }
}

/// Everything handlers and gates share. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<PermissionTable>,
    pub decoder: Arc<TokenDecoder>,
    pub token_lifetimes: TokenLifetimes,
    pub directory: Arc<MemoryDirectory>,
    pub posts: Arc<MemoryResourceStore>,
    pub audit: AuditCapture,
    pub audit_sink: Arc<dyn AuditSink>,
    pub logging: LoggingConfig,
}

impl AppState {
    /// Build state with the sink named in `config`.
    pub async fn new(config: &ServerConfig) -> Result<(Self, mpsc::Receiver<AuditEntry>)> {
        let sink: Arc<dyn AuditSink> = match config.audit.sink {
            AuditSinkKind::Memory => Arc::new(MemoryAuditSink::new()),
            AuditSinkKind::File => {
                let path = config
                    .audit
                    .path
                    .as_ref()
                    .context("audit.path is required for the file sink")?;
                let sink = JsonLinesAuditSink::open(path).await?;
                info!(path = %sink.path().display(), "Audit file opened");
                Arc::new(sink)
            }
        };
        Self::with_sink(config, sink)
    }

    /// Build state around an existing sink.
    pub fn with_sink(
        config: &ServerConfig,
        sink: Arc<dyn AuditSink>,
    ) -> Result<(Self, mpsc::Receiver<AuditEntry>)> {
        let registry = if config.permissions.is_empty() {
            PermissionTable::standard()
        } else {
            PermissionTable::from_grants(&config.permissions)?
        };

        let (audit, receiver) = AuditCapture::new(CaptureConfig {
            buffer_size: config.audit.buffer_size,
        });

        let state = Self {
            registry: Arc::new(registry),
            decoder: Arc::new(TokenDecoder::new(config.auth.jwt_secret.clone())),
            token_lifetimes: TokenLifetimes::from_config(&config.auth)?,
            directory: Arc::new(MemoryDirectory::new()),
            posts: Arc::new(MemoryResourceStore::new()),
            audit,
            audit_sink: sink,
            logging: config.logging.clone(),
        };
        state.seed(config);
        Ok((state, receiver))
    }

    fn seed(&self, config: &ServerConfig) {
        for user in &config.seed.users {
            self.directory.insert(UserRecord {
                id: user.id,
                username: user.username.clone(),
                email: user.email.clone(),
                role: user.role,
                is_active: user.is_active,
            });
        }
        for post in &config.seed.posts {
            self.posts.insert(OwnedResource {
                id: post.id.unwrap_or_else(ResourceId::new),
                owner_id: post.owner_id,
                created_at: Utc::now(),
                data: Post {
                    title: post.title.clone(),
                    content: post.content.clone(),
                    tags: post.tags.clone(),
                    is_published: post.is_published,
                },
            });
        }
        if !config.seed.users.is_empty() || !config.seed.posts.is_empty() {
            info!(
                users = config.seed.users.len(),
                posts = config.seed.posts.len(),
                "Seeded in-memory stores"
            );
        }
    }

    /// Permission gate for `key`, checked against this state's table.
    pub fn require_permission(&self, key: &str) -> Result<AuthzLayer, RegistryError> {
        AuthzLayer::permission(self.registry.clone(), self.audit.clone(), key)
    }

    /// Role-set gate.
    pub fn require_roles(&self, roles: impl IntoIterator<Item = Role>) -> AuthzLayer {
        AuthzLayer::roles(self.audit.clone(), roles)
    }
}
