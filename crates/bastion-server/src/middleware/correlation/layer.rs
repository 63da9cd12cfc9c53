//! Correlation and request logging middleware.

use super::context::{ClientInfo, CorrelationId};
use super::redaction::{redact_headers, redact_json};
use crate::config::LoggingConfig;
use axum::{
    body::{Body, Bytes, HttpBody},
    extract::Request,
    http::{header, Response},
};
use bastion_common_log::spans::{instrument_future, request_span};
use futures::future::BoxFuture;
use futures::StreamExt;
use std::{
    convert::Infallible,
    sync::Arc,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};
use tracing::{debug, info, warn};

/// Outermost layer: tags each request with a [`CorrelationId`] and
/// [`ClientInfo`], runs it inside a `request` span and logs one line on the
/// way in and one on the way out. The response is passed through unchanged.
#[derive(Clone, Default)]
pub struct CorrelationLayer {
    config: Arc<LoggingConfig>,
}

impl CorrelationLayer {
    pub fn new(config: LoggingConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

impl<S> Layer<S> for CorrelationLayer {
    type Service = CorrelationMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CorrelationMiddleware {
            inner,
            config: self.config.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CorrelationMiddleware<S> {
    inner: S,
    config: Arc<LoggingConfig>,
}

impl<S> Service<Request> for CorrelationMiddleware<S>
where
    S: Service<Request, Response = Response<Body>, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let config = self.config.clone();
        let mut inner = self.inner.clone();

        let correlation_id = CorrelationId::generate();
        let client = ClientInfo::from_request(&req);
        req.extensions_mut().insert(correlation_id.clone());
        req.extensions_mut().insert(client.clone());

        let method = req.method().clone();
        let uri = req.uri().clone();
        let quiet = config.is_excluded(uri.path());
        let headers = if quiet {
            Vec::new()
        } else {
            redact_headers(req.headers(), &[])
        };
        let span = request_span(correlation_id.as_str(), method.as_str(), uri.path());

        let future = async move {
            if !quiet {
                info!(
                    event = "request_started",
                    method = %method,
                    uri = %uri,
                    source_address = %client.source_address,
                    user_agent = %client.user_agent,
                );
                debug!(headers = ?headers, "Request headers");
            }

            let start = Instant::now();
            let response = inner.call(req).await?;
            if quiet {
                return Ok(response);
            }

            let status = response.status();
            let (response, payload) = if config.log_response_bodies {
                capture_payload(response, config.max_logged_body_bytes).await
            } else {
                (response, None)
            };

            info!(
                event = "request_completed",
                status = status.as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                response = payload.as_deref(),
            );

            Ok(response)
        };

        Box::pin(instrument_future(future, span))
    }
}

/// Copy out a small JSON body for logging and rebuild the response around
/// the same bytes. Anything streamed, oversized or non-JSON is left alone.
async fn capture_payload(
    response: Response<Body>,
    limit: usize,
) -> (Response<Body>, Option<String>) {
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));
    let fits = response
        .body()
        .size_hint()
        .exact()
        .is_some_and(|len| len as usize <= limit);
    if !is_json || !fits {
        return (response, None);
    }

    let (parts, body) = response.into_parts();
    let (body, bytes) = read_body(body).await;
    let payload = bytes.map(|bytes| render_payload(&bytes));
    (Response::from_parts(parts, body), payload)
}

/// Buffer `body`, returning a replacement that yields the same frames.
///
/// If a frame fails, the replacement replays what was read and then the
/// same error, and no bytes are returned.
async fn read_body(body: Body) -> (Body, Option<Bytes>) {
    let mut stream = body.into_data_stream();
    let mut chunks = Vec::new();
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(chunk) => chunks.push(chunk),
            Err(err) => {
                warn!(error = %err, "Failed to read response body for logging");
                let replay = chunks.into_iter().map(Ok).chain(std::iter::once(Err(err)));
                return (Body::from_stream(futures::stream::iter(replay)), None);
            }
        }
    }

    let bytes = Bytes::from(chunks.concat());
    (Body::from(bytes.clone()), Some(bytes))
}

fn render_payload(bytes: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(mut value) => {
            redact_json(&mut value);
            value.to_string()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}
