//! The audit entry record.

use crate::{AuditAction, AuditEntryId};
use bastion_common_core::{Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder stored when the source address or user agent is unavailable.
pub const UNKNOWN: &str = "unknown";

/// One immutable line of the audit trail.
///
/// Entries are append-only. Nothing in Bastion mutates or deletes one after
/// it has been built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    /// Unique entry identifier.
    pub id: AuditEntryId,
    /// What happened (operation name or denial kind).
    pub action: AuditAction,
    /// Resource category, permission key or route the action targeted.
    pub resource: String,
    /// Identifier of the specific resource instance, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Who performed or attempted the action.
    pub actor_id: UserId,
    /// The actor's role at the time of the request.
    pub actor_role: Role,
    /// State before an update, as supplied by the handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_state: Option<serde_json::Value>,
    /// State after an update, as supplied by the handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_state: Option<serde_json::Value>,
    /// Client address the request came from.
    pub source_address: String,
    /// Client user agent.
    pub user_agent: String,
    /// HTTP status the request ended with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Correlation id of the request that produced the entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    /// Wall-clock time the entry was constructed.
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Create a new entry builder.
    pub fn builder(
        action: impl Into<AuditAction>,
        resource: impl Into<String>,
        actor_id: UserId,
        actor_role: Role,
    ) -> AuditEntryBuilder {
        AuditEntryBuilder::new(action.into(), resource.into(), actor_id, actor_role)
    }
}

/// Builder for constructing audit entries.
#[derive(Debug)]
pub struct AuditEntryBuilder {
    action: AuditAction,
    resource: String,
    resource_id: Option<String>,
    actor_id: UserId,
    actor_role: Role,
    previous_state: Option<serde_json::Value>,
    new_state: Option<serde_json::Value>,
    source_address: Option<String>,
    user_agent: Option<String>,
    status: Option<u16>,
    correlation_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
}

impl AuditEntryBuilder {
    fn new(action: AuditAction, resource: String, actor_id: UserId, actor_role: Role) -> Self {
        Self {
            action,
            resource,
            resource_id: None,
            actor_id,
            actor_role,
            previous_state: None,
            new_state: None,
            source_address: None,
            user_agent: None,
            status: None,
            correlation_id: None,
            timestamp: None,
        }
    }

    /// Set the targeted resource instance.
    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Set the state snapshot taken before the operation.
    pub fn previous_state(mut self, state: serde_json::Value) -> Self {
        self.previous_state = Some(state);
        self
    }

    /// Set the state snapshot taken after the operation.
    pub fn new_state(mut self, state: serde_json::Value) -> Self {
        self.new_state = Some(state);
        self
    }

    /// Set the client address.
    pub fn source_address(mut self, address: impl Into<String>) -> Self {
        self.source_address = Some(address.into());
        self
    }

    /// Set the client user agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set the response status the request ended with.
    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Set the request correlation id.
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Override the timestamp (defaults to now).
    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    /// Build the entry.
    pub fn build(self) -> AuditEntry {
        AuditEntry {
            id: AuditEntryId::new(),
            action: self.action,
            resource: self.resource,
            resource_id: self.resource_id,
            actor_id: self.actor_id,
            actor_role: self.actor_role,
            previous_state: self.previous_state,
            new_state: self.new_state,
            source_address: self.source_address.unwrap_or_else(|| UNKNOWN.to_string()),
            user_agent: self.user_agent.unwrap_or_else(|| UNKNOWN.to_string()),
            status: self.status,
            correlation_id: self.correlation_id,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let actor = UserId::new();
        let entry =
            AuditEntry::builder(AuditAction::CreatePost, "posts", actor, Role::Editor).build();

        assert_eq!(entry.actor_id, actor);
        assert_eq!(entry.actor_role, Role::Editor);
        assert_eq!(entry.source_address, UNKNOWN);
        assert_eq!(entry.user_agent, UNKNOWN);
        assert!(entry.resource_id.is_none());
        assert!(entry.previous_state.is_none());
    }

    #[test]
    fn test_builder_snapshots_and_context() {
        let entry = AuditEntry::builder("UPDATE_POST", "posts", UserId::new(), Role::Admin)
            .resource_id("res_1")
            .previous_state(json!({"title": "old"}))
            .new_state(json!({"title": "new"}))
            .source_address("10.0.0.1")
            .user_agent("curl/8.0")
            .status(200)
            .correlation_id("corr-1-abc")
            .build();

        assert_eq!(entry.action, AuditAction::UpdatePost);
        assert_eq!(entry.previous_state.unwrap()["title"], "old");
        assert_eq!(entry.new_state.unwrap()["title"], "new");
        assert_eq!(entry.status, Some(200));
        assert_eq!(entry.correlation_id.as_deref(), Some("corr-1-abc"));
    }

    #[test]
    fn test_entry_json_shape() {
        let entry = AuditEntry::builder(
            AuditAction::PermissionDenied,
            "posts:delete",
            UserId::new(),
            Role::Viewer,
        )
        .status(403)
        .build();
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["action"], "PERMISSION_DENIED");
        assert_eq!(value["resource"], "posts:delete");
        assert_eq!(value["actorRole"], "viewer");
        assert_eq!(value["status"], 403);
        assert!(value.get("previousState").is_none());

        let back: AuditEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
