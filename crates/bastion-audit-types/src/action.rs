//! Audited action names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Action recorded on an audit entry.
///
/// Serialized as its SCREAMING_SNAKE_CASE name so stored entries stay
/// readable and stable across releases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
    // Gate denials
    UnauthorizedAccess,
    PermissionDenied,
    NotOwner,

    // Posts
    CreatePost,
    UpdatePost,
    DeletePost,

    // Users
    UpdateUser,
    DeleteUser,

    /// Any other operation name supplied by a route.
    Custom(String),
}

impl AuditAction {
    /// Get the stored name of this action.
    pub fn as_str(&self) -> &str {
        match self {
            Self::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::NotOwner => "NOT_OWNER",
            Self::CreatePost => "CREATE_POST",
            Self::UpdatePost => "UPDATE_POST",
            Self::DeletePost => "DELETE_POST",
            Self::UpdateUser => "UPDATE_USER",
            Self::DeleteUser => "DELETE_USER",
            Self::Custom(name) => name,
        }
    }

    /// Check if this action records a gate denial rather than a completed operation.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            Self::UnauthorizedAccess | Self::PermissionDenied | Self::NotOwner
        )
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for AuditAction {
    fn from(name: String) -> Self {
        match name.as_str() {
            "UNAUTHORIZED_ACCESS" => Self::UnauthorizedAccess,
            "PERMISSION_DENIED" => Self::PermissionDenied,
            "NOT_OWNER" => Self::NotOwner,
            "CREATE_POST" => Self::CreatePost,
            "UPDATE_POST" => Self::UpdatePost,
            "DELETE_POST" => Self::DeletePost,
            "UPDATE_USER" => Self::UpdateUser,
            "DELETE_USER" => Self::DeleteUser,
            _ => Self::Custom(name),
        }
    }
}

impl From<&str> for AuditAction {
    fn from(name: &str) -> Self {
        Self::from(name.to_string())
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        match action {
            AuditAction::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_names_map_to_variants() {
        assert_eq!(AuditAction::from("DELETE_POST"), AuditAction::DeletePost);
        assert_eq!(AuditAction::from("NOT_OWNER"), AuditAction::NotOwner);
    }

    #[test]
    fn test_unknown_name_is_custom() {
        let action = AuditAction::from("ARCHIVE_POST");
        assert_eq!(action, AuditAction::Custom("ARCHIVE_POST".into()));
        assert_eq!(action.to_string(), "ARCHIVE_POST");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&AuditAction::PermissionDenied).unwrap();
        assert_eq!(json, "\"PERMISSION_DENIED\"");
        let back: AuditAction = serde_json::from_str("\"UPDATE_USER\"").unwrap();
        assert_eq!(back, AuditAction::UpdateUser);
    }

    #[test]
    fn test_denial_actions() {
        assert!(AuditAction::UnauthorizedAccess.is_denial());
        assert!(AuditAction::NotOwner.is_denial());
        assert!(!AuditAction::CreatePost.is_denial());
    }
}
