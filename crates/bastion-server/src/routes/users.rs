//! `/api/v1/users`: directory administration.

use crate::directory::UserChanges;
use crate::error::{ApiError, ApiResult};
use crate::middleware::audit::{AuditLayer, AuditTrail};
use crate::middleware::auth::CurrentIdentity;
use crate::middleware::authz::RegistryError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    routing::{delete, get, put},
    Json, Router,
};
use bastion_audit_capture::AuditAction;
use bastion_common_core::UserId;
use serde_json::{json, Value};

const CATEGORY: &str = "users";

pub fn router(state: &AppState) -> Result<Router<AppState>, RegistryError> {
    let audited = |action| AuditLayer::new(state.audit.clone(), action, CATEGORY);

    Ok(Router::new()
        .route("/", get(list_users).layer(state.require_permission("users:read")?))
        .route("/:id", get(get_user).layer(state.require_permission("users:read")?))
        .route(
            "/:id",
            put(update_user)
                .layer(audited(AuditAction::UpdateUser))
                .layer(state.require_permission("users:update")?),
        )
        .route(
            "/:id",
            delete(delete_user)
                .layer(audited(AuditAction::DeleteUser))
                .layer(state.require_permission("users:delete")?),
        ))
}

fn parse_user_id(raw: &str) -> ApiResult<UserId> {
    UserId::parse(raw).map_err(|_| ApiError::NotFound("User".into()))
}

async fn list_users(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "users": state.directory.list() }))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let user = state
        .directory
        .get(&parse_user_id(&id)?)
        .ok_or_else(|| ApiError::NotFound("User".into()))?;
    Ok(Json(json!({ "user": user })))
}

async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    trail: AuditTrail,
    Json(changes): Json<UserChanges>,
) -> ApiResult<Json<Value>> {
    let id = parse_user_id(&id)?;
    let (before, after) = state
        .directory
        .update(&id, changes)
        .ok_or_else(|| ApiError::NotFound("User".into()))?;
    trail.set_resource_id(id);
    trail.record_previous(&before);
    trail.record_new(&after);

    Ok(Json(json!({ "message": "User updated successfully", "user": after })))
}

async fn delete_user(
    State(state): State<AppState>,
    CurrentIdentity(caller): CurrentIdentity,
    Path(id): Path<String>,
    trail: AuditTrail,
) -> ApiResult<Json<Value>> {
    let id = parse_user_id(&id)?;
    if id == caller.id {
        return Err(ApiError::BadRequest("cannot delete your own account".into()));
    }
    let removed = state
        .directory
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound("User".into()))?;
    trail.set_resource_id(id);
    trail.record_previous(&removed);

    Ok(Json(json!({ "message": "User deleted successfully" })))
}
