//! Authorization middleware layer.

use super::registry::{Decision, Permission, PermissionTable, RegistryError};
use crate::{
    error::ApiError,
    middleware::{audit::AuditContext, auth::Identity},
};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    response::{IntoResponse, Response},
};
use bastion_audit_capture::{AuditAction, AuditCapture};
use bastion_common_core::Role;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{error, warn};

#[derive(Clone)]
enum Rule {
    /// Caller's role must be one of these.
    Roles(Arc<[Role]>),
    /// Caller's role must hold this permission.
    Permission(Arc<PermissionTable>, Permission),
}

/// Role-set or permission gate. Denials are audited before the 403 is sent.
#[derive(Clone)]
pub struct AuthzLayer {
    rule: Rule,
    audit: AuditCapture,
}

impl AuthzLayer {
    /// Allow only callers whose role is in `roles`.
    pub fn roles(audit: AuditCapture, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            rule: Rule::Roles(roles.into_iter().collect()),
            audit,
        }
    }

    /// Allow only callers whose role holds `key`. Fails if the table does
    /// not define `key`, so a misspelt gate is caught when routes are built.
    pub fn permission(
        registry: Arc<PermissionTable>,
        audit: AuditCapture,
        key: &str,
    ) -> Result<Self, RegistryError> {
        let permission = registry.require(key)?;
        Ok(Self {
            rule: Rule::Permission(registry, permission),
            audit,
        })
    }
}

impl<S> Layer<S> for AuthzLayer {
    type Service = AuthzMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthzMiddleware {
            inner,
            rule: self.rule.clone(),
            audit: self.audit.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthzMiddleware<S> {
    inner: S,
    rule: Rule,
    audit: AuditCapture,
}

impl<S> Service<Request<Body>> for AuthzMiddleware<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let rule = self.rule.clone();
        let audit = self.audit.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(identity) = req.extensions().get::<Identity>().cloned() else {
                warn!(code = "UNAUTHENTICATED", "Authorization check without authentication");
                return Ok(ApiError::Unauthenticated.into_response());
            };

            if let Err(denial) = evaluate(&rule, &identity) {
                let context = AuditContext::capture(&req);
                let (action, resource) = match &denial {
                    ApiError::PermissionDenied { permission, .. } => {
                        (AuditAction::PermissionDenied, permission.clone())
                    }
                    _ => (AuditAction::UnauthorizedAccess, route_of(&req)),
                };
                warn!(
                    user_id = %identity.id,
                    role = %identity.role,
                    code = denial.error_code(),
                    resource = %resource,
                    "Authorization denied"
                );
                let status = denial.status_code().as_u16();
                audit.record(context.entry(action, resource, &identity).status(status).build());
                return Ok(denial.into_response());
            }

            inner.call(req).await
        })
    }
}

fn evaluate(rule: &Rule, identity: &Identity) -> Result<(), ApiError> {
    match rule {
        Rule::Roles(roles) if roles.contains(&identity.role) => Ok(()),
        Rule::Roles(roles) => Err(ApiError::InsufficientRole {
            required: roles.to_vec(),
            actual: identity.role,
        }),
        Rule::Permission(registry, permission) => {
            match registry.check(identity.role, permission.as_str()) {
                Decision::Allowed => Ok(()),
                decision => {
                    if decision == Decision::UnknownPermission {
                        error!(permission = %permission, "Permission missing from table, denying");
                    }
                    Err(ApiError::PermissionDenied {
                        permission: permission.to_string(),
                        actual: identity.role,
                    })
                }
            }
        }
    }
}

fn route_of(req: &Request<Body>) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_audit_capture::CaptureConfig;
    use bastion_common_core::UserId;

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::new(),
            role,
            is_active: true,
        }
    }

    #[test]
    fn test_role_rule() {
        let rule = Rule::Roles(Arc::from(vec![Role::Admin]));
        assert!(evaluate(&rule, &identity(Role::Admin)).is_ok());
        assert!(matches!(
            evaluate(&rule, &identity(Role::Editor)),
            Err(ApiError::InsufficientRole { actual: Role::Editor, .. })
        ));
    }

    #[test]
    fn test_permission_rule() {
        let registry = Arc::new(PermissionTable::standard());
        let permission = registry.require("posts:delete").unwrap();
        let rule = Rule::Permission(registry, permission);

        assert!(evaluate(&rule, &identity(Role::Admin)).is_ok());
        for role in [Role::Editor, Role::Viewer] {
            match evaluate(&rule, &identity(role)) {
                Err(ApiError::PermissionDenied { permission, actual }) => {
                    assert_eq!(permission, "posts:delete");
                    assert_eq!(actual, role);
                }
                other => panic!("expected PermissionDenied, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_key_fails_at_build() {
        let (audit, _rx) = AuditCapture::new(CaptureConfig::default());
        let table = Arc::new(PermissionTable::standard());
        let result = AuthzLayer::permission(table, audit, "posts:publish");
        assert!(matches!(result, Err(RegistryError::UnknownPermission(_))));
    }
}
