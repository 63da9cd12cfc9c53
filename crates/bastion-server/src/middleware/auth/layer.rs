//! Authentication middleware layer.

use super::{
    jwt::TokenDecoder,
    types::{AuthRejection, Identity, TokenType},
};
use crate::directory::IdentityLookup;
use crate::error::ApiError;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request},
    response::{IntoResponse, Response},
};
use bastion_common_log::spans::record_user;
use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::{debug, error, warn};

/// Authentication layer configuration.
#[derive(Clone)]
pub struct AuthLayer {
    decoder: Arc<TokenDecoder>,
    directory: Arc<dyn IdentityLookup>,
}

impl AuthLayer {
    /// Create new auth layer.
    pub fn new(decoder: Arc<TokenDecoder>, directory: Arc<dyn IdentityLookup>) -> Self {
        Self { decoder, directory }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            decoder: self.decoder.clone(),
            directory: self.directory.clone(),
        }
    }
}

/// Authentication middleware service.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    decoder: Arc<TokenDecoder>,
    directory: Arc<dyn IdentityLookup>,
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
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
        let decoder = self.decoder.clone();
        let directory = self.directory.clone();
        let mut inner = self.inner.clone();
        let token = extract_token(req.headers()).map(str::to_owned);

        Box::pin(async move {
            let verified = match token {
                Ok(token) => {
                    verify_token(&token, TokenType::Access, &decoder, directory.as_ref()).await
                }
                Err(rejection) => Err(rejection),
            };
            match verified {
                Ok(identity) => {
                    record_user(&identity.id);
                    debug!(user_id = %identity.id, role = %identity.role, "Authenticated");
                    req.extensions_mut().insert(identity);
                    inner.call(req).await
                }
                Err(rejection) => {
                    if let AuthRejection::InvalidCredential(reason) = &rejection {
                        warn!(reason = %reason, "Credential rejected");
                    }
                    Ok(ApiError::from(rejection).into_response())
                }
            }
        })
    }
}

/// Verify a token of the `expected` type and resolve its subject against the
/// directory. Inactive and unknown subjects are rejected.
pub async fn verify_token(
    token: &str,
    expected: TokenType,
    decoder: &TokenDecoder,
    directory: &dyn IdentityLookup,
) -> Result<Identity, AuthRejection> {
    let claims = decoder
        .decode(token)
        .map_err(|e| AuthRejection::InvalidCredential(e.to_string()))?;

    if claims.token_type != expected {
        return Err(AuthRejection::InvalidCredential(format!(
            "expected a {expected:?} token"
        )));
    }
    if claims.is_expired() {
        return Err(AuthRejection::InvalidCredential("token expired".into()));
    }

    let user_id = claims
        .user_id()
        .ok_or_else(|| AuthRejection::InvalidCredential("malformed subject".into()))?;

    match directory.resolve_identity(&user_id).await {
        Ok(Some(identity)) if identity.is_active => Ok(identity),
        Ok(_) => Err(AuthRejection::InactiveOrUnknownIdentity),
        Err(err) => {
            error!(user_id = %user_id, error = %err, "Identity lookup failed");
            Err(AuthRejection::InvalidCredential("identity lookup failed".into()))
        }
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// A missing header, an empty header or a bearer scheme with nothing after it
/// all count as no credential at all.
fn extract_token(headers: &HeaderMap) -> Result<&str, AuthRejection> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Err(AuthRejection::NoCredential);
    };
    let value = value
        .to_str()
        .map_err(|_| AuthRejection::InvalidCredential("non-ascii authorization header".into()))?
        .trim();

    if value.is_empty() || value.eq_ignore_ascii_case("bearer") {
        return Err(AuthRejection::NoCredential);
    }

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            let token = token.trim();
            if token.is_empty() {
                Err(AuthRejection::NoCredential)
            } else {
                Ok(token)
            }
        }
        _ => Err(AuthRejection::InvalidCredential("unsupported authorization scheme".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{MemoryDirectory, UserRecord};
    use crate::middleware::auth::Claims;
    use axum::http::StatusCode;
    use bastion_common_core::Role;
    use tower::ServiceExt;

    const SECRET: &str = "auth_layer_test_secret_32_chars!";

    fn token_of(auth: Option<&str>) -> Result<String, AuthRejection> {
        let mut headers = HeaderMap::new();
        if let Some(value) = auth {
            headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        }
        extract_token(&headers).map(str::to_owned)
    }

    #[test]
    fn test_extract_token_from_bearer_header() {
        assert_eq!(token_of(Some("Bearer test_token")).unwrap(), "test_token");
        assert_eq!(token_of(Some("bearer test_token")).unwrap(), "test_token");
    }

    #[test]
    fn test_missing_or_empty_bearer_is_no_credential() {
        for auth in [None, Some(""), Some("Bearer"), Some("Bearer ")] {
            assert_eq!(token_of(auth), Err(AuthRejection::NoCredential), "{auth:?}");
        }
    }

    #[test]
    fn test_other_scheme_is_invalid() {
        assert!(matches!(
            token_of(Some("Basic dXNlcjpwYXNz")),
            Err(AuthRejection::InvalidCredential(_))
        ));
    }

    fn directory_with(user: UserRecord) -> Arc<MemoryDirectory> {
        let directory = Arc::new(MemoryDirectory::new());
        directory.insert(user);
        directory
    }

    #[tokio::test]
    async fn test_verify_token_checks_type_and_activity() {
        let decoder = TokenDecoder::new(SECRET);
        let mut user = UserRecord::new("grace", Role::Editor);
        let id = user.id;
        let directory = directory_with(user.clone());

        let access = decoder.encode(&Claims::new_access(id, 60)).unwrap();
        let refresh = decoder.encode(&Claims::new_refresh(id, 60)).unwrap();

        let identity = verify_token(&access, TokenType::Access, &decoder, &*directory)
            .await
            .unwrap();
        assert_eq!(identity.role, Role::Editor);
        assert!(matches!(
            verify_token(&refresh, TokenType::Access, &decoder, &*directory).await,
            Err(AuthRejection::InvalidCredential(_))
        ));

        user.is_active = false;
        directory.insert(user);
        assert_eq!(
            verify_token(&access, TokenType::Access, &decoder, &*directory).await,
            Err(AuthRejection::InactiveOrUnknownIdentity)
        );
    }

    #[tokio::test]
    async fn test_gate_runs_on_a_spawned_task() {
        let user = UserRecord::new("grace", Role::Viewer);
        let id = user.id;
        let decoder = Arc::new(TokenDecoder::new(SECRET));
        let token = decoder.encode(&Claims::new_access(id, 60)).unwrap();

        let service = AuthLayer::new(decoder, directory_with(user)).layer(tower::service_fn(
            |req: Request<Body>| async move {
                let status = match req.extensions().get::<Identity>() {
                    Some(_) => StatusCode::NO_CONTENT,
                    None => StatusCode::INTERNAL_SERVER_ERROR,
                };
                Ok::<_, Infallible>(status.into_response())
            },
        ));

        let req = Request::builder()
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = tokio::spawn(service.clone().oneshot(req)).await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let req = Request::builder().body(Body::empty()).unwrap();
        let response = tokio::spawn(service.oneshot(req)).await.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
