//! Permission table: which roles hold which `category:action` keys.

use crate::config::PermissionGrant;
use bastion_common_core::Role;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Errors building or querying the permission table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("malformed permission key `{0}` (expected `category:action`)")]
    MalformedKey(String),

    #[error("permission `{0}` is not defined in the table")]
    UnknownPermission(String),

    #[error("permission `{0}` is defined more than once")]
    DuplicateKey(String),
}

/// A permission key known to exist in a [`PermissionTable`].
///
/// Only [`PermissionTable::require`] hands these out, so a gate holding one
/// was configured against a key the table defines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Permission(String);

impl Permission {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn category(&self) -> &str {
        self.0.split_once(':').map(|(c, _)| c).unwrap_or(&self.0)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a permission lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
    /// The key is not in the table. Gates treat this as a denial.
    UnknownPermission,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed)
    }
}

const STANDARD: &[(&str, &[Role])] = &[
    ("users:read", &[Role::Admin]),
    ("users:create", &[Role::Admin]),
    ("users:update", &[Role::Admin]),
    ("users:delete", &[Role::Admin]),
    ("posts:read", &[Role::Admin, Role::Editor, Role::Viewer]),
    ("posts:create", &[Role::Admin, Role::Editor]),
    ("posts:update", &[Role::Admin, Role::Editor]),
    ("posts:delete", &[Role::Admin]),
    ("admin:access", &[Role::Admin]),
];

/// Static map from permission key to the roles that hold it.
///
/// Built once at startup and shared read-only behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTable {
    grants: BTreeMap<String, HashSet<Role>>,
}

impl PermissionTable {
    /// The built-in table.
    pub fn standard() -> Self {
        let grants = STANDARD
            .iter()
            .map(|(key, roles)| (key.to_string(), roles.iter().copied().collect()))
            .collect();
        Self { grants }
    }

    /// Build a table from configured grants, rejecting malformed or
    /// repeated keys.
    pub fn from_grants(grants: &[PermissionGrant]) -> Result<Self, RegistryError> {
        let mut table = BTreeMap::new();
        for grant in grants {
            validate_key(&grant.key)?;
            let roles = grant.roles.iter().copied().collect();
            if table.insert(grant.key.clone(), roles).is_some() {
                return Err(RegistryError::DuplicateKey(grant.key.clone()));
            }
        }
        Ok(Self { grants: table })
    }

    /// Look up whether `role` holds `permission`.
    pub fn check(&self, role: Role, permission: &str) -> Decision {
        match self.grants.get(permission) {
            Some(roles) if roles.contains(&role) => Decision::Allowed,
            Some(_) => Decision::Denied,
            None => Decision::UnknownPermission,
        }
    }

    pub fn is_allowed(&self, role: Role, permission: &str) -> bool {
        self.check(role, permission).is_allowed()
    }

    /// Resolve a key for a gate, failing if the table does not define it.
    pub fn require(&self, key: &str) -> Result<Permission, RegistryError> {
        validate_key(key)?;
        if self.grants.contains_key(key) {
            Ok(Permission(key.to_string()))
        } else {
            Err(RegistryError::UnknownPermission(key.to_string()))
        }
    }

    /// Every key in the table, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }

    pub fn roles_for(&self, key: &str) -> Option<&HashSet<Role>> {
        self.grants.get(key)
    }
}

impl Default for PermissionTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn validate_key(key: &str) -> Result<(), RegistryError> {
    match key.split_once(':') {
        Some((category, action))
            if !category.is_empty() && !action.is_empty() && !action.contains(':') =>
        {
            Ok(())
        }
        _ => Err(RegistryError::MalformedKey(key.to_string())),
    }
}
