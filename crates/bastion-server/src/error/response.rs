//! Error response implementation.

use super::types::ApiError;
use axum::{
    response::{IntoResponse, Response},
    Json,
};
use bastion_common_core::Role;
use serde::Serialize;
use tracing::{error, warn};

/// Error response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    required_roles: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    permission: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_role: Option<Role>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            error!(
                error = %self,
                cause = ?std::error::Error::source(&self),
                code = self.error_code(),
                "Server error occurred"
            );
        } else if self.status_code().as_u16() == 401 {
            warn!(
                error = %self,
                code = self.error_code(),
                "Auth error occurred"
            );
        }

        let status = self.status_code();
        let mut body = ErrorBody {
            error: self.to_string(),
            code: self.error_code(),
            required_roles: None,
            permission: None,
            user_role: None,
        };

        match self {
            ApiError::InsufficientRole { required, actual } => {
                body.required_roles = Some(required);
                body.user_role = Some(actual);
            }
            ApiError::PermissionDenied { permission, actual } => {
                body.permission = Some(permission);
                body.user_role = Some(actual);
            }
            ApiError::Internal(err) => {
                // Don't expose internal error details in production
                if cfg!(debug_assertions) {
                    body.error = format!("{}: {}", body.error, err);
                }
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;
    use serde_json::Value;

    async fn body_of(err: ApiError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_role_denial_body() {
        let (status, body) = body_of(ApiError::InsufficientRole {
            required: vec![Role::Admin],
            actual: Role::Viewer,
        })
        .await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Insufficient permissions");
        assert_eq!(body["code"], "INSUFFICIENT_ROLE");
        assert_eq!(body["requiredRoles"], serde_json::json!(["admin"]));
        assert_eq!(body["userRole"], "viewer");
    }

    #[tokio::test]
    async fn test_permission_denial_body() {
        let (_, body) = body_of(ApiError::PermissionDenied {
            permission: "posts:delete".into(),
            actual: Role::Viewer,
        })
        .await;

        assert_eq!(body["error"], "Permission denied: posts:delete");
        assert_eq!(body["permission"], "posts:delete");
        assert_eq!(body["userRole"], "viewer");
        assert!(body.get("requiredRoles").is_none());
    }

    #[tokio::test]
    async fn test_plain_body_has_only_error_and_code() {
        let (status, body) = body_of(ApiError::NoCredential).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, serde_json::json!({
            "error": "Access denied. No token provided.",
            "code": "NO_TOKEN"
        }));
    }
}
