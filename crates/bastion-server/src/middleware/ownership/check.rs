//! Single-resource ownership gate.

use crate::error::ApiError;
use crate::middleware::{audit::AuditContext, auth::Identity, path_param, ID_PARAM};
use crate::store::ResourceLookup;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use bastion_audit_capture::{AuditAction, AuditCapture};
use bastion_common_core::ResourceId;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, error, warn};

/// Loads the resource named by a path parameter and lets the request through
/// only if the caller owns it or is an admin. The loaded
/// [`OwnedResource`](crate::store::OwnedResource) is attached to the request
/// for the handler.
#[derive(Clone)]
pub struct OwnershipLayer {
    store: Arc<dyn ResourceLookup>,
    audit: AuditCapture,
    category: Arc<str>,
}

impl OwnershipLayer {
    pub fn new(store: Arc<dyn ResourceLookup>, audit: AuditCapture, category: &str) -> Self {
        Self {
            store,
            audit,
            category: category.into(),
        }
    }
}

impl<S> Layer<S> for OwnershipLayer {
    type Service = OwnershipMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OwnershipMiddleware {
            inner,
            layer: self.clone(),
        }
    }
}

#[derive(Clone)]
pub struct OwnershipMiddleware<S> {
    inner: S,
    layer: OwnershipLayer,
}

impl<S> Service<Request<Body>> for OwnershipMiddleware<S>
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
        let layer = self.layer.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(identity) = req.extensions().get::<Identity>().cloned() else {
                warn!(code = "UNAUTHENTICATED", "Ownership check without authentication");
                return Ok(ApiError::Unauthenticated.into_response());
            };

            let (mut req, raw_id) = path_param(req, ID_PARAM).await;
            let Some(raw_id) = raw_id else {
                error!(param = ID_PARAM, "Route has no resource id parameter");
                return Ok(ApiError::Internal(anyhow::anyhow!(
                    "missing path parameter `{ID_PARAM}`"
                ))
                .into_response());
            };

            // An id that cannot parse cannot name an existing resource.
            let Ok(id) = ResourceId::parse(&raw_id) else {
                debug!(resource_id = %raw_id, "Unparseable resource id");
                return Ok(ApiError::NotFound("Resource".into()).into_response());
            };

            let resource = match layer.store.find_by_id(&id).await {
                Ok(Some(resource)) => resource,
                Ok(None) => return Ok(ApiError::NotFound("Resource".into()).into_response()),
                Err(err) => {
                    error!(resource_id = %id, error = %err, "Resource lookup failed");
                    return Ok(ApiError::from(err).into_response());
                }
            };

            if !identity.is_admin() && resource.owner_id != identity.id {
                warn!(
                    user_id = %identity.id,
                    resource_id = %id,
                    owner_id = %resource.owner_id,
                    code = "NOT_OWNER",
                    "Ownership denied"
                );
                let entry = AuditContext::capture(&req)
                    .entry(AuditAction::NotOwner, layer.category.as_ref(), &identity)
                    .resource_id(id.to_string())
                    .status(ApiError::NotOwner.status_code().as_u16())
                    .build();
                layer.audit.record(entry);
                return Ok(ApiError::NotOwner.into_response());
            }

            req.extensions_mut().insert(resource);
            inner.call(req).await
        })
    }
}
