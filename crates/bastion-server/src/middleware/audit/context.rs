//! Request details every audit entry carries.

use crate::middleware::auth::Identity;
use crate::middleware::correlation::{ClientInfo, CorrelationId};
use axum::http::Request;
use bastion_audit_capture::{AuditAction, AuditEntry, AuditEntryBuilder};

/// Client and correlation details captured from a request before it is
/// handed on, so they are still available once the response is back.
#[derive(Debug, Clone)]
pub struct AuditContext {
    client: ClientInfo,
    correlation_id: Option<String>,
}

impl AuditContext {
    pub fn capture<B>(req: &Request<B>) -> Self {
        Self {
            client: ClientInfo::from_request(req),
            correlation_id: req
                .extensions()
                .get::<CorrelationId>()
                .map(|id| id.as_str().to_string()),
        }
    }

    /// Start an entry for `identity` pre-filled with this request's details.
    pub fn entry(
        &self,
        action: AuditAction,
        resource: impl Into<String>,
        identity: &Identity,
    ) -> AuditEntryBuilder {
        let builder = AuditEntry::builder(action, resource, identity.id, identity.role)
            .source_address(self.client.source_address.clone())
            .user_agent(self.client.user_agent.clone());
        match &self.correlation_id {
            Some(id) => builder.correlation_id(id.clone()),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_common_core::{Role, UserId};

    #[test]
    fn test_entry_carries_request_details() {
        let mut req = Request::new(());
        req.extensions_mut().insert(ClientInfo {
            source_address: "203.0.113.1".into(),
            user_agent: "curl/8.0".into(),
        });
        let identity = Identity {
            id: UserId::new(),
            role: Role::Viewer,
            is_active: true,
        };

        let entry = AuditContext::capture(&req)
            .entry(AuditAction::NotOwner, "posts", &identity)
            .build();

        assert_eq!(entry.source_address, "203.0.113.1");
        assert_eq!(entry.user_agent, "curl/8.0");
        assert_eq!(entry.actor_id, identity.id);
        assert_eq!(entry.actor_role, Role::Viewer);
        assert!(entry.correlation_id.is_none());
    }
}
