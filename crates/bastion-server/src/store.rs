//! Owned resources and the store the ownership gate reads them from.

use crate::error::LookupError;
use crate::middleware::ownership::OwnershipFilter;
use async_trait::async_trait;
use bastion_common_core::{ResourceId, UserId};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A resource instance with a single owning identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedResource {
    pub id: ResourceId,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: Post,
}

/// Fetches a resource by id for the ownership gate.
#[async_trait]
pub trait ResourceLookup: Send + Sync {
    /// `Ok(None)` when no such resource exists.
    async fn find_by_id(&self, id: &ResourceId) -> Result<Option<OwnedResource>, LookupError>;
}

/// Post body, the example resource served under `/api/v1/posts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "published_by_default")]
    pub is_published: bool,
}

fn published_by_default() -> bool {
    true
}

/// Partial update applied by `PUT /posts/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_published: Option<bool>,
}

impl PostChanges {
    pub fn apply(self, post: &mut Post) {
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(is_published) = self.is_published {
            post.is_published = is_published;
        }
    }
}

/// In-process post store.
#[derive(Debug, Default)]
pub struct MemoryResourceStore {
    items: RwLock<HashMap<ResourceId, OwnedResource>>,
}

impl MemoryResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new resource owned by `owner_id`.
    pub fn create(&self, owner_id: UserId, data: Post) -> OwnedResource {
        let resource = OwnedResource {
            id: ResourceId::new(),
            owner_id,
            created_at: Utc::now(),
            data,
        };
        self.insert(resource.clone());
        resource
    }

    pub fn insert(&self, resource: OwnedResource) {
        self.items.write().insert(resource.id, resource);
    }

    pub fn get(&self, id: &ResourceId) -> Option<OwnedResource> {
        self.items.read().get(id).cloned()
    }

    /// Published resources visible under `filter`, newest first.
    pub fn list(&self, filter: &OwnershipFilter) -> Vec<OwnedResource> {
        let mut items: Vec<_> = self
            .items
            .read()
            .values()
            .filter(|r| r.data.is_published && filter.permits(&r.owner_id))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    /// Apply `changes`, returning the resource before and after.
    pub fn update(
        &self,
        id: &ResourceId,
        changes: PostChanges,
    ) -> Option<(OwnedResource, OwnedResource)> {
        let mut items = self.items.write();
        let item = items.get_mut(id)?;
        let before = item.clone();
        changes.apply(&mut item.data);
        Some((before, item.clone()))
    }

    pub fn remove(&self, id: &ResourceId) -> Option<OwnedResource> {
        self.items.write().remove(id)
    }
}

#[async_trait]
impl ResourceLookup for MemoryResourceStore {
    async fn find_by_id(&self, id: &ResourceId) -> Result<Option<OwnedResource>, LookupError> {
        Ok(self.get(id))
    }
}
