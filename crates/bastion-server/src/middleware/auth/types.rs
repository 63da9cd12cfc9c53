//! Authentication types.

use bastion_common_core::{Role, UserId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims structure.
///
/// Only the subject is trusted; role and active flag are always re-read from
/// the identity directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Token type (access/refresh).
    pub token_type: TokenType,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
    /// JWT ID.
    pub jti: String,
}

/// Token type enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    Access,
    Refresh,
}

impl Claims {
    /// Create new access token claims.
    pub fn new_access(user_id: UserId, expires_in: i64) -> Self {
        Self::new(user_id, TokenType::Access, expires_in)
    }

    /// Create new refresh token claims.
    pub fn new_refresh(user_id: UserId, expires_in: i64) -> Self {
        Self::new(user_id, TokenType::Refresh, expires_in)
    }

    fn new(user_id: UserId, token_type: TokenType, expires_in: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            token_type,
            iat: now,
            exp: now + expires_in,
            jti: Uuid::new_v4().to_string(),
        }
    }

    /// Parse the subject as a user ID.
    pub fn user_id(&self) -> Option<UserId> {
        UserId::parse(&self.sub).ok()
    }

    /// Check if token is expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// The authenticated caller, attached to the request by the auth gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub role: Role,
    pub is_active: bool,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Why the auth gate turned a request away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthRejection {
    /// No usable bearer credential was presented.
    NoCredential,
    /// The credential failed verification. The reason is logged, never sent.
    InvalidCredential(String),
    /// The subject is unknown or deactivated.
    InactiveOrUnknownIdentity,
}

impl From<AuthRejection> for crate::error::ApiError {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::NoCredential => Self::NoCredential,
            AuthRejection::InvalidCredential(_) => Self::InvalidCredential,
            AuthRejection::InactiveOrUnknownIdentity => Self::InactiveOrUnknownIdentity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_subject_roundtrip() {
        let id = UserId::new();
        let claims = Claims::new_access(id, 60);
        assert_eq!(claims.user_id(), Some(id));
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_claims_expiry() {
        let claims = Claims::new_refresh(UserId::new(), -10);
        assert!(claims.is_expired());
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_malformed_subject() {
        let mut claims = Claims::new_access(UserId::new(), 60);
        claims.sub = "someone".into();
        assert!(claims.user_id().is_none());
    }
}
