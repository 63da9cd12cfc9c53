//! Post-response audit recorder.

use super::context::AuditContext;
use super::trail::AuditTrail;
use crate::middleware::auth::Identity;
use crate::middleware::{path_param, ID_PARAM};
use crate::store::OwnedResource;
use axum::{body::Body, http::Request, response::Response};
use bastion_audit_capture::{AuditAction, AuditCapture};
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::debug;

/// Records one audit entry for a route once its handler has produced a
/// response, whatever its status.
///
/// The entry is submitted after the response exists, and submission cannot
/// fail or delay it. A request whose handler is dropped before responding,
/// or that carries no identity, produces no entry.
#[derive(Clone)]
pub struct AuditLayer {
    audit: AuditCapture,
    action: AuditAction,
    resource: Arc<str>,
}

impl AuditLayer {
    pub fn new(audit: AuditCapture, action: AuditAction, resource: &str) -> Self {
        Self {
            audit,
            action,
            resource: resource.into(),
        }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditMiddleware {
            inner,
            layer: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuditMiddleware<S> {
    inner: S,
    layer: AuditLayer,
}

impl<S> Service<Request<Body>> for AuditMiddleware<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let layer = self.layer.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let identity = req.extensions().get::<Identity>().cloned();
            let context = AuditContext::capture(&req);
            let loaded_id = req.extensions().get::<OwnedResource>().map(|r| r.id.to_string());
            let trail = AuditTrail::new();
            req.extensions_mut().insert(trail.clone());
            let (req, path_id) = path_param(req, ID_PARAM).await;

            let response = inner.call(req).await?;

            let Some(identity) = identity else {
                debug!(action = %layer.action, "No identity on request, audit skipped");
                return Ok(response);
            };
            let state = trail.take();
            let status = response.status();
            if !status.is_success() {
                debug!(action = %layer.action, status = status.as_u16(), "Operation failed");
            }
            let mut entry = context
                .entry(layer.action.clone(), layer.resource.as_ref(), &identity)
                .status(status.as_u16());
            if let Some(id) = state.resource_id.or(loaded_id).or(path_id) {
                entry = entry.resource_id(id);
            }
            if let Some(previous) = state.previous {
                entry = entry.previous_state(previous);
            }
            if let Some(new) = state.new {
                entry = entry.new_state(new);
            }
            layer.audit.record(entry.build());

            Ok(response)
        })
    }
}
