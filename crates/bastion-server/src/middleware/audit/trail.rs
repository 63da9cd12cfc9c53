//! Request-scoped slot where handlers leave before/after snapshots.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Default)]
pub(crate) struct TrailState {
    pub resource_id: Option<String>,
    pub previous: Option<Value>,
    pub new: Option<Value>,
}

/// Handle a handler uses to hand snapshot data to the audit recorder.
///
/// The audit layer inserts one per request and reads it back after the
/// handler returns. On routes without that layer the extractor yields a
/// detached trail whose contents go nowhere.
#[derive(Debug, Clone, Default)]
pub struct AuditTrail {
    state: Arc<Mutex<TrailState>>,
}

impl AuditTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the resource instance, for operations where the path has no id.
    pub fn set_resource_id(&self, id: impl ToString) {
        self.state.lock().resource_id = Some(id.to_string());
    }

    pub fn record_previous(&self, state: &impl Serialize) {
        self.state.lock().previous = snapshot(state);
    }

    pub fn record_new(&self, state: &impl Serialize) {
        self.state.lock().new = snapshot(state);
    }

    pub(crate) fn take(&self) -> TrailState {
        std::mem::take(&mut *self.state.lock())
    }
}

fn snapshot(state: &impl Serialize) -> Option<Value> {
    match serde_json::to_value(state) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, "Audit snapshot could not be serialized");
            None
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuditTrail
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<AuditTrail>().cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use serde_json::json;

    #[tokio::test]
    async fn test_extractor_shares_inserted_trail() {
        let trail = AuditTrail::new();
        let (mut parts, _) = Request::new(()).into_parts();
        parts.extensions.insert(trail.clone());

        let extracted = AuditTrail::from_request_parts(&mut parts, &()).await.unwrap();
        extracted.record_new(&json!({"title": "new"}));
        extracted.set_resource_id("res_1");

        let state = trail.take();
        assert_eq!(state.new, Some(json!({"title": "new"})));
        assert_eq!(state.resource_id.as_deref(), Some("res_1"));
        assert!(state.previous.is_none());
    }

    #[tokio::test]
    async fn test_missing_trail_is_detached() {
        let (mut parts, _) = Request::new(()).into_parts();
        let trail = AuditTrail::from_request_parts(&mut parts, &()).await.unwrap();
        trail.record_previous(&json!({"a": 1}));
    }
}
