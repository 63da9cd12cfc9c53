//! Collection filter derived from the caller's identity.

use crate::error::ApiError;
use crate::middleware::auth::Identity;
use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use bastion_common_core::UserId;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::warn;

/// Restriction a collection handler must apply to what it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnershipFilter {
    /// Every resource is visible.
    Unrestricted,
    /// Only resources owned by this identity are visible.
    OwnedBy(UserId),
    /// Nothing is visible.
    Empty,
}

impl OwnershipFilter {
    /// Admins see everything; everyone else sees their own resources.
    pub fn for_identity(identity: &Identity) -> Self {
        if identity.is_admin() {
            Self::Unrestricted
        } else {
            Self::OwnedBy(identity.id)
        }
    }

    pub fn permits(&self, owner: &UserId) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::OwnedBy(id) => id == owner,
            Self::Empty => false,
        }
    }

    /// Intersection of two filters. Never widens either input.
    pub fn narrow(self, other: Self) -> Self {
        match (self, other) {
            (Self::Unrestricted, f) | (f, Self::Unrestricted) => f,
            (Self::OwnedBy(a), Self::OwnedBy(b)) if a == b => Self::OwnedBy(a),
            _ => Self::Empty,
        }
    }
}

/// Attaches an [`OwnershipFilter`] for the caller, narrowing any filter an
/// earlier stage already attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipFilterLayer;

impl OwnershipFilterLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for OwnershipFilterLayer {
    type Service = OwnershipFilterMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OwnershipFilterMiddleware { inner }
    }
}

#[derive(Clone)]
pub struct OwnershipFilterMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for OwnershipFilterMiddleware<S>
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
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(identity) = req.extensions().get::<Identity>().cloned() else {
                warn!(code = "UNAUTHENTICATED", "Ownership filter without authentication");
                return Ok(ApiError::Unauthenticated.into_response());
            };

            let mut filter = OwnershipFilter::for_identity(&identity);
            if let Some(existing) = req.extensions_mut().remove::<OwnershipFilter>() {
                filter = existing.narrow(filter);
            }
            req.extensions_mut().insert(filter);

            inner.call(req).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_common_core::Role;
    use proptest::prelude::*;

    fn identity(role: Role) -> Identity {
        Identity {
            id: UserId::new(),
            role,
            is_active: true,
        }
    }

    #[test]
    fn test_for_identity() {
        assert_eq!(
            OwnershipFilter::for_identity(&identity(Role::Admin)),
            OwnershipFilter::Unrestricted
        );

        let editor = identity(Role::Editor);
        assert_eq!(OwnershipFilter::for_identity(&editor), OwnershipFilter::OwnedBy(editor.id));
    }

    #[test]
    fn test_narrow_distinct_owners_is_empty() {
        let a = OwnershipFilter::OwnedBy(UserId::new());
        let b = OwnershipFilter::OwnedBy(UserId::new());
        assert_eq!(a.narrow(b), OwnershipFilter::Empty);
    }

    fn filter() -> impl Strategy<Value = OwnershipFilter> {
        let owners = [UserId::new(), UserId::new()];
        prop_oneof![
            Just(OwnershipFilter::Unrestricted),
            Just(OwnershipFilter::Empty),
            (0usize..2).prop_map(move |i| OwnershipFilter::OwnedBy(owners[i])),
        ]
    }

    proptest! {
        #[test]
        fn narrow_never_widens(a in filter(), b in filter(), owner_idx in 0usize..3) {
            let candidates = match (&a, &b) {
                (OwnershipFilter::OwnedBy(x), _) | (_, OwnershipFilter::OwnedBy(x)) => {
                    [*x, UserId::new(), UserId::new()]
                }
                _ => [UserId::new(), UserId::new(), UserId::new()],
            };
            let owner = candidates[owner_idx];
            let narrowed = a.clone().narrow(b.clone());
            if narrowed.permits(&owner) {
                prop_assert!(a.permits(&owner) && b.permits(&owner));
            }
        }

        #[test]
        fn non_admins_only_see_their_own(
            role in prop_oneof![Just(Role::Editor), Just(Role::Viewer)]
        ) {
            let me = identity(role);
            let filter = OwnershipFilter::for_identity(&me);
            prop_assert!(filter.permits(&me.id));
            prop_assert!(!filter.permits(&UserId::new()));
        }
    }
}
