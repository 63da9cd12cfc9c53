//! Identity directory: the source of truth for role and active status.

use crate::error::LookupError;
use crate::middleware::auth::Identity;
use async_trait::async_trait;
use bastion_common_core::{Role, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Resolves a token subject to the identity the gates act on.
#[async_trait]
pub trait IdentityLookup: Send + Sync {
    /// `Ok(None)` when the subject does not exist.
    async fn resolve_identity(&self, id: &UserId) -> Result<Option<Identity>, LookupError>;
}

/// A user as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub role: Role,
    pub is_active: bool,
}

impl UserRecord {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(),
            username: username.into(),
            email: None,
            role,
            is_active: true,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            role: self.role,
            is_active: self.is_active,
        }
    }
}

/// Partial update applied by `PUT /users/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    fn apply(self, user: &mut UserRecord) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = Some(email);
        }
        if let Some(role) = self.role {
            user.role = role;
        }
        if let Some(is_active) = self.is_active {
            user.is_active = is_active;
        }
    }
}

/// In-process user directory.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserRecord) {
        self.users.write().insert(user.id, user);
    }

    pub fn get(&self, id: &UserId) -> Option<UserRecord> {
        self.users.read().get(id).cloned()
    }

    /// Every user, ordered by username.
    pub fn list(&self) -> Vec<UserRecord> {
        let mut users: Vec<_> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    /// Apply `changes`, returning the record before and after.
    pub fn update(&self, id: &UserId, changes: UserChanges) -> Option<(UserRecord, UserRecord)> {
        let mut users = self.users.write();
        let user = users.get_mut(id)?;
        let before = user.clone();
        changes.apply(user);
        Some((before, user.clone()))
    }

    pub fn remove(&self, id: &UserId) -> Option<UserRecord> {
        self.users.write().remove(id)
    }
}

#[async_trait]
impl IdentityLookup for MemoryDirectory {
    async fn resolve_identity(&self, id: &UserId) -> Result<Option<Identity>, LookupError> {
        Ok(self.get(id).map(|user| user.identity()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_reflects_current_record() {
        let directory = MemoryDirectory::new();
        let user = UserRecord::new("ada", Role::Editor);
        let id = user.id;
        directory.insert(user);

        let identity = directory.resolve_identity(&id).await.unwrap().unwrap();
        assert_eq!(identity.role, Role::Editor);
        assert!(identity.is_active);

        directory.update(
            &id,
            UserChanges {
                role: Some(Role::Viewer),
                is_active: Some(false),
                ..Default::default()
            },
        );
        let identity = directory.resolve_identity(&id).await.unwrap().unwrap();
        assert_eq!(identity.role, Role::Viewer);
        assert!(!identity.is_active);
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let directory = MemoryDirectory::new();
        assert!(directory.resolve_identity(&UserId::new()).await.unwrap().is_none());
    }

    #[test]
    fn test_update_returns_snapshots() {
        let directory = MemoryDirectory::new();
        let user = UserRecord::new("grace", Role::Viewer);
        let id = user.id;
        directory.insert(user);

        let (before, after) = directory
            .update(&id, UserChanges { username: Some("hopper".into()), ..Default::default() })
            .unwrap();
        assert_eq!(before.username, "grace");
        assert_eq!(after.username, "hopper");
        assert!(directory.update(&UserId::new(), UserChanges::default()).is_none());
    }

    #[test]
    fn test_changes_reject_unknown_fields() {
        let result: Result<UserChanges, _> = serde_json::from_str(r#"{"password":"x"}"#);
        assert!(result.is_err());
    }
}
