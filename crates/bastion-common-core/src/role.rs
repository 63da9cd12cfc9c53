//! Coarse-grained identity roles.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Role carried by every identity.
///
/// Admin holds every permission the table grants it; there is no numeric
/// ordering between roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// Full administrative access.
    Admin,
    /// May author and edit content.
    Editor,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Get all roles.
    pub fn all() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        Self::iter()
    }

    /// Check if this is the admin role.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_role_string_forms() {
        assert_eq!(Role::Admin.to_string(), "admin");
        assert_eq!(Role::from_str("editor").unwrap(), Role::Editor);
        assert!(Role::from_str("owner").is_err());
    }

    #[test]
    fn test_role_serde_lowercase() {
        let json = serde_json::to_string(&Role::Viewer).unwrap();
        assert_eq!(json, "\"viewer\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert!(role.is_admin());
    }

    #[test]
    fn test_all_roles() {
        assert_eq!(Role::all().count(), 3);
    }
}
