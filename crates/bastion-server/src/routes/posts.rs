//! `/api/v1/posts`: the owned example resource.

use crate::error::{ApiError, ApiResult};
use crate::middleware::audit::{AuditLayer, AuditTrail};
use crate::middleware::auth::CurrentIdentity;
use crate::middleware::authz::RegistryError;
use crate::middleware::ownership::{OwnershipFilter, OwnershipFilterLayer, OwnershipLayer};
use crate::state::AppState;
use crate::store::{OwnedResource, Post, PostChanges, ResourceLookup};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use bastion_audit_capture::AuditAction;
use bastion_common_core::ResourceId;
use serde_json::{json, Value};
use std::sync::Arc;

const CATEGORY: &str = "posts";

pub fn router(state: &AppState) -> Result<Router<AppState>, RegistryError> {
    let store: Arc<dyn ResourceLookup> = state.posts.clone();
    let owned = OwnershipLayer::new(store, state.audit.clone(), CATEGORY);
    let audited = |action| AuditLayer::new(state.audit.clone(), action, CATEGORY);

    Ok(Router::new()
        .route("/", get(list_posts).layer(OwnershipFilterLayer::new()))
        .route(
            "/",
            post(create_post)
                .layer(audited(AuditAction::CreatePost))
                .layer(state.require_permission("posts:create")?),
        )
        .route("/:id", get(get_post))
        .route(
            "/:id",
            put(update_post)
                .layer(audited(AuditAction::UpdatePost))
                .layer(owned.clone())
                .layer(state.require_permission("posts:update")?),
        )
        .route(
            "/:id",
            delete(delete_post)
                .layer(audited(AuditAction::DeletePost))
                .layer(owned)
                .layer(state.require_permission("posts:delete")?),
        ))
}

async fn list_posts(
    State(state): State<AppState>,
    Extension(filter): Extension<OwnershipFilter>,
) -> Json<Value> {
    let posts = state.posts.list(&filter);
    Json(json!({ "total": posts.len(), "posts": posts }))
}

async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let post = ResourceId::parse(&id)
        .ok()
        .and_then(|id| state.posts.get(&id))
        .ok_or_else(|| ApiError::NotFound("Post".into()))?;
    Ok(Json(json!({ "post": post })))
}

async fn create_post(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    trail: AuditTrail,
    Json(post): Json<Post>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    if post.title.trim().is_empty() || post.content.trim().is_empty() {
        return Err(ApiError::BadRequest("title and content are required".into()));
    }

    let created = state.posts.create(identity.id, post);
    trail.set_resource_id(created.id);
    trail.record_new(&created);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Post created successfully", "post": created })),
    ))
}

async fn update_post(
    State(state): State<AppState>,
    Extension(resource): Extension<OwnedResource>,
    trail: AuditTrail,
    Json(changes): Json<PostChanges>,
) -> ApiResult<Json<Value>> {
    let (before, after) = state
        .posts
        .update(&resource.id, changes)
        .ok_or_else(|| ApiError::NotFound("Post".into()))?;
    trail.record_previous(&before);
    trail.record_new(&after);

    Ok(Json(json!({ "message": "Post updated successfully", "post": after })))
}

async fn delete_post(
    State(state): State<AppState>,
    Extension(resource): Extension<OwnedResource>,
    trail: AuditTrail,
) -> ApiResult<Json<Value>> {
    let removed = state
        .posts
        .remove(&resource.id)
        .ok_or_else(|| ApiError::NotFound("Post".into()))?;
    trail.record_previous(&removed);

    Ok(Json(json!({ "message": "Post deleted successfully" })))
}
