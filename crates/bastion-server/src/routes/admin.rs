//! `/api/v1/admin`: audit trail access.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use bastion_common_core::Role;
use serde::Deserialize;
use serde_json::{json, Value};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/audit-logs",
        get(recent_audit_logs).layer(state.require_roles([Role::Admin])),
    )
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

/// Most recent entries, oldest first.
async fn recent_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<Value>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let entries = state
        .audit_sink
        .recent(limit)
        .await
        .map_err(|e| ApiError::Internal(e.into()))?;

    Ok(Json(json!({ "count": entries.len(), "entries": entries })))
}
