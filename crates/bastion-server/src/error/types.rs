//! API error types.

use axum::http::StatusCode;
use bastion_common_core::Role;
use thiserror::Error;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Every way a request can be turned away.
///
/// The three 401 variants are raised only by the authentication gate. The
/// 403 variants come from the role, permission and ownership gates.
#[derive(Debug, Error)]
pub enum ApiError {
    // 400 Bad Request
    #[error("Bad request: {0}")]
    BadRequest(String),

    // 401 Unauthorized
    #[error("Access denied. No token provided.")]
    NoCredential,

    #[error("Invalid token or user inactive.")]
    InactiveOrUnknownIdentity,

    #[error("Invalid token.")]
    InvalidCredential,

    // 403 Forbidden
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    InsufficientRole { required: Vec<Role>, actual: Role },

    #[error("Permission denied: {permission}")]
    PermissionDenied { permission: String, actual: Role },

    #[error("Access denied. You do not own this resource.")]
    NotOwner,

    // 404 Not Found
    #[error("{0} not found")]
    NotFound(String),

    // 500 Internal Server Error
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,

            Self::NoCredential
            | Self::InactiveOrUnknownIdentity
            | Self::InvalidCredential => StatusCode::UNAUTHORIZED,

            Self::Unauthenticated
            | Self::InsufficientRole { .. }
            | Self::PermissionDenied { .. }
            | Self::NotOwner => StatusCode::FORBIDDEN,

            Self::NotFound(_) => StatusCode::NOT_FOUND,

            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for client handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::NoCredential => "NO_TOKEN",
            Self::InactiveOrUnknownIdentity => "INVALID_TOKEN",
            Self::InvalidCredential => "TOKEN_INVALID",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InsufficientRole { .. } => "INSUFFICIENT_ROLE",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::NotOwner => "NOT_OWNER",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Check if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

/// Failure of a collaborator store.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
    #[error("lookup backend unavailable: {0}")]
    Unavailable(String),
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        ApiError::Internal(err.into())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ApiError::NoCredential, 401, "NO_TOKEN")]
    #[test_case(ApiError::InactiveOrUnknownIdentity, 401, "INVALID_TOKEN")]
    #[test_case(ApiError::InvalidCredential, 401, "TOKEN_INVALID")]
    #[test_case(ApiError::Unauthenticated, 403, "UNAUTHENTICATED")]
    #[test_case(ApiError::NotOwner, 403, "NOT_OWNER")]
    #[test_case(ApiError::NotFound("Resource".into()), 404, "NOT_FOUND")]
    #[test_case(ApiError::Internal(anyhow::anyhow!("boom")), 500, "INTERNAL_ERROR")]
    fn test_status_and_code(err: ApiError, status: u16, code: &str) {
        assert_eq!(err.status_code().as_u16(), status);
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_denial_messages() {
        let err = ApiError::PermissionDenied {
            permission: "posts:delete".into(),
            actual: Role::Viewer,
        };
        assert_eq!(err.to_string(), "Permission denied: posts:delete");
        assert!(err.is_client_error());

        let err = ApiError::InsufficientRole {
            required: vec![Role::Admin],
            actual: Role::Editor,
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.error_code(), "INSUFFICIENT_ROLE");
    }

    #[test]
    fn test_lookup_error_is_internal() {
        let err: ApiError = LookupError::Unavailable("db down".into()).into();
        assert!(err.is_server_error());
    }
}
